//! Shared playback context.
//!
//! One [`Scheduler`] exists for the lifetime of the program (a `static` on
//! target). It bundles everything the foreground and the timer callback
//! share: both queues, the speed, the player state and diagnostics.
//!
//! # Player state
//!
//! ```text
//! Idle       arm()            ▶ Armed       foreground, work queued
//! Armed      halt()           ▶ Idle        foreground
//! Armed      begin_firing()   ▶ Firing      callback
//! Firing     arm()            ▶ Requested   foreground, work queued
//! Firing     finish(true)     ▶ Armed       callback
//! Firing     finish(false)    ▶ Idle        callback
//! Requested  finish(_)        ▶ Armed       callback
//! ```
//!
//! Only the foreground leaves `Idle`. The callback decides whether the
//! chain continues before it gives up `Firing`; work queued after that
//! decision is flagged by `arm()` as `Requested` and keeps the chain alive.
//!
//! `halt()` never interrupts a callback: it waits it out, so once it
//! returns no callback is touching the queues and any stale firing exits
//! immediately.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::config::{Speed, MESSAGE_QUEUE_SIZE, START_DELAY_US, TICK_QUEUE_SIZE};
use crate::fault::FaultState;
use crate::io::{Alarm, KeyOutput};
use crate::ring::SpscRing;
use crate::unit::{Tick, Unit};

/// Units waiting for playback. Foreground produces, timer context consumes.
pub type MessageQueue = SpscRing<Unit, MESSAGE_QUEUE_SIZE>;

/// Ticks waiting for playback. Timer context only, except for resets made
/// after `halt()`.
pub type TickQueue = SpscRing<Tick, TICK_QUEUE_SIZE>;

/// Tick player state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayerState {
    /// No firing pending.
    Idle = 0,
    /// Next firing scheduled.
    Armed = 1,
    /// Callback running.
    Firing = 2,
    /// Callback running, and work was queued after it started.
    Requested = 3,
}

impl PlayerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PlayerState::Armed,
            2 => PlayerState::Firing,
            3 => PlayerState::Requested,
            _ => PlayerState::Idle,
        }
    }
}

/// Shared playback context.
pub struct Scheduler {
    messages: MessageQueue,
    ticks: TickQueue,
    speed: Speed,
    state: AtomicU8,
    fault: FaultState,
    units_played: AtomicU32,
}

impl Scheduler {
    /// Empty queues, default speed, player idle.
    pub const fn new() -> Self {
        Self {
            messages: MessageQueue::new(),
            ticks: TickQueue::new(),
            speed: Speed::new(),
            state: AtomicU8::new(PlayerState::Idle as u8),
            fault: FaultState::new(),
            units_played: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn messages(&self) -> &MessageQueue {
        &self.messages
    }

    #[inline]
    pub fn ticks(&self) -> &TickQueue {
        &self.ticks
    }

    #[inline]
    pub fn speed(&self) -> &Speed {
        &self.speed
    }

    #[inline]
    pub fn fault(&self) -> &FaultState {
        &self.fault
    }

    #[inline]
    pub fn state(&self) -> PlayerState {
        PlayerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True while a callback chain is alive.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() != PlayerState::Idle
    }

    /// True when both queues are empty.
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.messages.is_empty() && self.ticks.is_empty()
    }

    /// Units dequeued for playback since boot.
    #[inline]
    pub fn units_played(&self) -> u32 {
        self.units_played.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn note_unit_played(&self) {
        self.units_played.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn transition(&self, from: PlayerState, to: PlayerState) -> Result<(), PlayerState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(PlayerState::from_u8)
    }

    /// Start the player if work is queued and no chain is alive (foreground).
    ///
    /// A callback in progress is flagged instead, so it re-arms on exit.
    /// Returns `true` if this call armed the first firing.
    pub fn arm<A: Alarm>(&self, alarm: &A) -> bool {
        if self.messages.is_empty() {
            return false;
        }
        loop {
            match self.transition(PlayerState::Idle, PlayerState::Armed) {
                Ok(()) => {
                    alarm.arm_in(START_DELAY_US);
                    return true;
                }
                Err(PlayerState::Firing) => {
                    match self.transition(PlayerState::Firing, PlayerState::Requested) {
                        // Callback went idle in between: retry
                        Err(PlayerState::Idle) => continue,
                        _ => return false,
                    }
                }
                Err(_) => return false,
            }
        }
    }

    /// Stop the callback chain and confirm it stopped (foreground).
    ///
    /// Waits out a running callback, then cancels the pending deadline.
    /// Queues are left as they are.
    pub fn halt<A: Alarm>(&self, alarm: &A) {
        loop {
            match self.transition(PlayerState::Armed, PlayerState::Idle) {
                Ok(()) | Err(PlayerState::Idle) => break,
                Err(_) => core::hint::spin_loop(),
            }
        }
        alarm.cancel();
    }

    /// Halt, empty both queues, then force the output (foreground).
    pub fn flush_all<A: Alarm, O: KeyOutput>(&self, alarm: &A, out: &O, level: bool) {
        self.halt(alarm);
        self.messages.clear();
        self.ticks.clear();
        out.set(level);
    }

    /// Halt, drop the character being played and turn the output off
    /// (foreground). Queued units stay queued.
    pub fn abort_playback<A: Alarm, O: KeyOutput>(&self, alarm: &A, out: &O) {
        self.halt(alarm);
        self.ticks.clear();
        out.set(false);
    }

    /// Enter the callback (timer context). `false` means the chain was
    /// halted and this firing must do nothing.
    #[inline]
    pub(crate) fn begin_firing(&self) -> bool {
        self.transition(PlayerState::Armed, PlayerState::Firing).is_ok()
    }

    /// Leave the callback (timer context).
    ///
    /// With `rearm` the chain continues. Without it the player goes idle
    /// unless `arm()` flagged new work meanwhile. Returns whether the chain
    /// continues.
    #[inline]
    pub(crate) fn finish_firing(&self, rearm: bool) -> bool {
        if !rearm && self.transition(PlayerState::Firing, PlayerState::Idle).is_ok() {
            return false;
        }
        self.state.store(PlayerState::Armed as u8, Ordering::Release);
        true
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct CountingAlarm {
        armed: Cell<u32>,
        cancelled: Cell<u32>,
    }

    impl Alarm for CountingAlarm {
        fn arm_in(&self, _delay_us: u32) {
            self.armed.set(self.armed.get() + 1);
        }

        fn cancel(&self) {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }

    #[test]
    fn test_arm_requires_work() {
        let sched = Scheduler::new();
        let alarm = CountingAlarm::default();

        assert!(!sched.arm(&alarm));
        assert_eq!(sched.state(), PlayerState::Idle);

        sched.messages().push(Unit::Char(b'E')).unwrap();
        assert!(sched.arm(&alarm));
        assert_eq!(sched.state(), PlayerState::Armed);
        assert_eq!(alarm.armed.get(), 1);
    }

    #[test]
    fn test_no_double_arm() {
        let sched = Scheduler::new();
        let alarm = CountingAlarm::default();
        sched.messages().push(Unit::Char(b'E')).unwrap();

        assert!(sched.arm(&alarm));
        assert!(!sched.arm(&alarm));
        assert_eq!(alarm.armed.get(), 1);
    }

    #[test]
    fn test_halt_turns_stale_firing_into_noop() {
        let sched = Scheduler::new();
        let alarm = CountingAlarm::default();
        sched.messages().push(Unit::Char(b'E')).unwrap();
        sched.arm(&alarm);

        sched.halt(&alarm);

        assert_eq!(sched.state(), PlayerState::Idle);
        assert_eq!(alarm.cancelled.get(), 1);
        assert!(!sched.begin_firing());
    }

    #[test]
    fn test_halt_waits_for_running_callback() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        struct NoAlarm;
        impl Alarm for NoAlarm {
            fn arm_in(&self, _delay_us: u32) {}
            fn cancel(&self) {}
        }

        let sched = Arc::new(Scheduler::new());
        sched.messages().push(Unit::Char(b'E')).unwrap();
        sched.arm(&NoAlarm);
        assert!(sched.begin_firing());

        let finished = Arc::new(AtomicBool::new(false));
        let callback = {
            let sched = Arc::clone(&sched);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                finished.store(true, Ordering::SeqCst);
                sched.finish_firing(true);
            })
        };

        sched.halt(&NoAlarm);
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(sched.state(), PlayerState::Idle);
        callback.join().unwrap();
    }

    #[test]
    fn test_flush_all_empties_queues() {
        struct Led(Cell<bool>);
        impl KeyOutput for Led {
            fn set(&self, on: bool) {
                self.0.set(on);
            }
        }

        let sched = Scheduler::new();
        let alarm = CountingAlarm::default();
        let led = Led(Cell::new(false));
        sched.messages().push(Unit::Char(b'A')).unwrap();
        sched.ticks().push(Tick::DASH).unwrap();

        sched.flush_all(&alarm, &led, true);

        assert!(sched.is_drained());
        assert!(led.0.get());
        assert!(!sched.is_running());
    }

    #[test]
    fn test_arm_during_firing_keeps_chain_alive() {
        let sched = Scheduler::new();
        let alarm = CountingAlarm::default();
        sched.messages().push(Unit::Char(b'E')).unwrap();
        sched.arm(&alarm);
        assert!(sched.begin_firing());

        // Callback busy: no second arm, but the request is recorded
        assert!(!sched.arm(&alarm));
        assert_eq!(sched.state(), PlayerState::Requested);
        assert_eq!(alarm.armed.get(), 1);

        assert!(sched.finish_firing(false));
        assert_eq!(sched.state(), PlayerState::Armed);
    }

    #[test]
    fn test_idle_is_left_only_by_arm() {
        let sched = Scheduler::new();
        let alarm = CountingAlarm::default();
        sched.messages().push(Unit::RawDot).unwrap();
        sched.arm(&alarm);
        assert!(sched.begin_firing());
        assert!(!sched.finish_firing(false));

        // Work queued, but nobody armed: the state stays Idle
        sched.messages().push(Unit::RawDash).unwrap();
        assert_eq!(sched.state(), PlayerState::Idle);
        assert!(!sched.begin_firing());

        sched.halt(&alarm);
        assert_eq!(sched.state(), PlayerState::Idle);
        assert!(sched.arm(&alarm));
    }
}
