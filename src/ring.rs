//! Lock-free SPSC (Single Producer, Single Consumer) ring of byte-packed slots.
//!
//! Both playback queues are built on this type: the message queue between
//! the foreground loop and the timer callback, and the tick queue inside the
//! timer context.
//!
//! # Architecture
//!
//! ```text
//! Foreground ──push/retract──▶ SpscRing ──pop──▶ Timer callback
//!                              (lock-free)
//! ```
//!
//! # Rules
//!
//! - Only the producer pushes or retracts; only the consumer pops
//! - Head and tail share one atomic word, so every cursor move is a single CAS
//! - A slot is read only after the consumer has claimed it
//! - One slot always stays free: a full ring rejects pushes (backpressure)
//! - No operation blocks

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::unit::Slot;

/// Cursor pair packed as `head << 16 | tail`, both free-running `u16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cursors {
    head: u16,
    tail: u16,
}

impl Cursors {
    #[inline]
    fn unpack(word: u32) -> Self {
        Self {
            head: (word >> 16) as u16,
            tail: word as u16,
        }
    }

    #[inline]
    fn pack(self) -> u32 {
        ((self.head as u32) << 16) | self.tail as u32
    }

    #[inline]
    fn len(self) -> usize {
        self.head.wrapping_sub(self.tail) as usize
    }
}

/// Ring push rejected because every usable slot is occupied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Full;

/// Lock-free bounded SPSC ring.
///
/// `N` must be a power of 2 no larger than 2^15. Usable capacity is `N - 1`.
///
/// # Memory Ordering
///
/// - Producer stores the slot `Relaxed`, then publishes with a `Release` CAS
/// - Consumer claims with an `AcqRel` CAS, then loads the slot
/// - The claim happens before the read, so a retract can never hand back a
///   slot the consumer is reading, and the free slot keeps the producer off it
pub struct SpscRing<T: Slot, const N: usize> {
    slots: [AtomicU8; N],
    cursors: AtomicU32,
    _item: PhantomData<T>,
}

impl<T: Slot, const N: usize> SpscRing<T, N> {
    /// Mask for wrapping index to buffer size.
    const MASK: usize = N - 1;

    /// Create a new empty ring.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2 or exceeds 2^15.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Ring size must be power of 2");
        assert!(N <= 1 << 15, "Ring size must fit the 16-bit cursors");

        Self {
            slots: [const { AtomicU8::new(0) }; N],
            cursors: AtomicU32::new(0),
            _item: PhantomData,
        }
    }

    #[inline]
    fn load(&self) -> Cursors {
        Cursors::unpack(self.cursors.load(Ordering::Acquire))
    }

    #[inline]
    fn swap_cursors(&self, current: Cursors, next: Cursors) -> bool {
        self.cursors
            .compare_exchange_weak(current.pack(), next.pack(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    fn slot(&self, idx: u16) -> &AtomicU8 {
        &self.slots[idx as usize & Self::MASK]
    }

    /// Push an item (producer only).
    ///
    /// Never blocks. Returns [`Full`] and leaves the ring unchanged when
    /// `N - 1` items are already queued.
    #[inline]
    pub fn push(&self, item: T) -> Result<(), Full> {
        loop {
            let cur = self.load();
            if cur.len() >= Self::capacity() {
                return Err(Full);
            }
            // Slot `head` is outside [tail, head), the consumer never touches it.
            self.slot(cur.head).store(item.to_byte(), Ordering::Relaxed);
            let next = Cursors {
                head: cur.head.wrapping_add(1),
                ..cur
            };
            if self.swap_cursors(cur, next) {
                return Ok(());
            }
        }
    }

    /// Pop the oldest item (consumer only).
    #[inline]
    pub fn pop(&self) -> Option<T> {
        loop {
            let cur = self.load();
            if cur.head == cur.tail {
                return None;
            }
            let next = Cursors {
                tail: cur.tail.wrapping_add(1),
                ..cur
            };
            if self.swap_cursors(cur, next) {
                return Some(T::from_byte(self.slot(cur.tail).load(Ordering::Acquire)));
            }
        }
    }

    /// Remove the most recently pushed item (producer only).
    ///
    /// Returns `None` if the ring is empty, including when the consumer
    /// claimed the last item first.
    #[inline]
    pub fn retract(&self) -> Option<T> {
        loop {
            let cur = self.load();
            if cur.head == cur.tail {
                return None;
            }
            let head = cur.head.wrapping_sub(1);
            // Read before the CAS: once head moves back the slot is free for reuse.
            let item = T::from_byte(self.slot(head).load(Ordering::Relaxed));
            if self.swap_cursors(cur, Cursors { head, ..cur }) {
                return Some(item);
            }
        }
    }

    /// Drop every queued item (`tail = head`).
    ///
    /// Callable from either side; callers performing cross-context resets
    /// must quiesce the consumer first.
    #[inline]
    pub fn clear(&self) {
        loop {
            let cur = self.load();
            if self.swap_cursors(cur, Cursors { tail: cur.head, ..cur }) {
                return;
            }
        }
    }

    /// Peek at the oldest item without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<T> {
        let cur = self.load();
        if cur.head == cur.tail {
            return None;
        }
        Some(T::from_byte(self.slot(cur.tail).load(Ordering::Acquire)))
    }

    /// Number of queued items.
    #[inline]
    pub fn len(&self) -> usize {
        self.load().len()
    }

    /// True if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let cur = self.load();
        cur.head == cur.tail
    }

    /// True if the next push would be rejected.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= Self::capacity()
    }

    /// Usable capacity (`N - 1`).
    #[inline]
    pub const fn capacity() -> usize {
        N - 1
    }
}

impl<T: Slot, const N: usize> Default for SpscRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
