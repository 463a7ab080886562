//! Drift-free deadline chaining for one-shot timers.
//!
//! Timer services that only offer "fire in N µs from now" get wrapped with a
//! [`DeadlineChain`]: each re-arm is computed from the previous *scheduled*
//! instant, not from the moment the callback happened to run, so dispatch
//! latency never accumulates across pulses.
//!
//! Timestamps are wrapping `u32` microseconds (about 71 minutes per lap).
//! Differences are taken with `wrapping_sub`, which is exact as long as a
//! single step stays under 2^31 µs.

use core::sync::atomic::{AtomicU32, Ordering};

/// Next one-shot arming computed by [`DeadlineChain::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rearm {
    /// Delay to program into the one-shot timer, from now.
    pub delay_us: u32,
    /// How far past its scheduled instant the new deadline already is.
    /// Zero when on time.
    pub late_us: u32,
}

/// Absolute deadline of the pending firing.
///
/// Written by the foreground only while the player is idle (first arm) and
/// by the timer callback otherwise, never concurrently.
pub struct DeadlineChain {
    deadline_us: AtomicU32,
}

impl DeadlineChain {
    pub const fn new() -> Self {
        Self {
            deadline_us: AtomicU32::new(0),
        }
    }

    /// Start a new chain: first deadline `delay_us` after `now_us`.
    #[inline]
    pub fn start(&self, now_us: i64, delay_us: u32) -> u32 {
        let deadline = (now_us as u32).wrapping_add(delay_us);
        self.deadline_us.store(deadline, Ordering::Relaxed);
        delay_us
    }

    /// Move the chain `step_us` past the previous deadline.
    #[inline]
    pub fn advance(&self, now_us: i64, step_us: u32) -> Rearm {
        let deadline = self
            .deadline_us
            .load(Ordering::Relaxed)
            .wrapping_add(step_us);
        self.deadline_us.store(deadline, Ordering::Relaxed);

        let ahead = deadline.wrapping_sub(now_us as u32) as i32;
        if ahead >= 0 {
            Rearm {
                delay_us: ahead as u32,
                late_us: 0,
            }
        } else {
            Rearm {
                delay_us: 0,
                late_us: ahead.unsigned_abs(),
            }
        }
    }

    /// Scheduled instant of the pending firing (wrapping µs).
    #[inline]
    pub fn deadline_us(&self) -> u32 {
        self.deadline_us.load(Ordering::Relaxed)
    }
}

impl Default for DeadlineChain {
    fn default() -> Self {
        Self::new()
    }
}
