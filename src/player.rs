//! Tick player.
//!
//! Runs in the timer callback. Each firing drives the output for exactly
//! one tick and returns how long after the *previous scheduled instant* the
//! next firing is due. The binding adds that to its deadline chain, so a
//! late dispatch shortens the next wait instead of shifting every pulse.
//!
//! Timer contract (see [`Reschedule::as_alarm_return`]):
//! - negative return: re-arm that many µs after the previous deadline
//! - zero: the chain ends

use crate::config::START_DELAY_US;
use crate::expander::{refill, Refill};
use crate::io::KeyOutput;
use crate::logging::LogStream;
use crate::scheduler::Scheduler;
use crate::{rt_debug, rt_trace};

/// What the timer binding should do after a firing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reschedule {
    /// Fire again this many µs after the previous deadline.
    After(u32),
    /// Chain finished: do not re-arm.
    Stop,
}

impl Reschedule {
    /// Signed form used by alarm services that re-arm relative to the
    /// previous deadline on a negative return and stop on zero.
    #[inline]
    pub fn as_alarm_return(self) -> i64 {
        match self {
            Reschedule::After(us) => -i64::from(us.max(1)),
            Reschedule::Stop => 0,
        }
    }
}

/// Timer-context half of the blinker.
pub struct TickPlayer<'a, O: KeyOutput> {
    sched: &'a Scheduler,
    out: O,
    log: &'a LogStream,
}

impl<'a, O: KeyOutput> TickPlayer<'a, O> {
    pub fn new(sched: &'a Scheduler, out: O, log: &'a LogStream) -> Self {
        Self { sched, out, log }
    }

    /// Output sink driven by this player.
    pub fn output(&self) -> &O {
        &self.out
    }

    /// Timer callback body.
    ///
    /// # Timing
    ///
    /// O(1) apart from skipping unsupported symbols. Never blocks, never
    /// allocates. Logs go to the RT log stream only.
    pub fn fire(&self, now_us: i64) -> Reschedule {
        if !self.sched.begin_firing() {
            // Halted between arming and dispatch
            return Reschedule::Stop;
        }

        if self.sched.ticks().is_empty() {
            match refill(self.sched) {
                Refill::Drained => return self.go_idle(now_us),
                Refill::Loaded { unit, ticks } => {
                    let kind = if unit.is_raw() { "raw " } else { "" };
                    rt_debug!(self.log, now_us, "{}<{}> {} ticks", kind, unit.label(), ticks);
                }
            }
        }

        let Some(tick) = self.sched.ticks().pop() else {
            return self.go_idle(now_us);
        };

        self.out.set(tick.level.is_on());
        let step_us = tick.duration_us(self.sched.speed().unit_us());
        self.sched.finish_firing(true);

        rt_trace!(
            self.log,
            now_us,
            "{} x{} ({} us)",
            if tick.level.is_on() { "on" } else { "off" },
            tick.duration,
            step_us
        );
        Reschedule::After(step_us)
    }

    fn go_idle(&self, now_us: i64) -> Reschedule {
        self.out.set(false);

        // Decided before leaving Firing, so halt() cannot slip in between
        let pending = !self.sched.messages().is_empty();
        if self.sched.finish_firing(pending) {
            rt_debug!(self.log, now_us, "late input, restarting");
            return Reschedule::After(START_DELAY_US);
        }

        rt_debug!(self.log, now_us, "drained, idle");
        Reschedule::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandInterpreter, Outcome};
    use crate::io::Alarm;
    use crate::scheduler::PlayerState;
    use crate::unit::Unit;
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    #[derive(Default)]
    struct Trace(RefCell<Vec<bool>>);

    impl KeyOutput for Trace {
        fn set(&self, on: bool) {
            self.0.borrow_mut().push(on);
        }
    }

    #[derive(Default)]
    struct OneShot(Cell<Option<u32>>);

    impl Alarm for OneShot {
        fn arm_in(&self, delay_us: u32) {
            self.0.set(Some(delay_us));
        }
        fn cancel(&self) {
            self.0.set(None);
        }
    }

    #[test]
    fn test_single_dot_sequence() {
        let sched = Scheduler::new();
        let log = LogStream::new();
        let alarm = OneShot::default();
        let player = TickPlayer::new(&sched, Trace::default(), &log);

        sched.messages().push(Unit::Char(b'E')).unwrap();
        assert!(sched.arm(&alarm));
        assert_eq!(alarm.0.get(), Some(START_DELAY_US));

        assert_eq!(player.fire(1_000), Reschedule::After(60_000));
        assert_eq!(player.fire(61_000), Reschedule::After(180_000));
        assert_eq!(player.fire(241_000), Reschedule::Stop);

        assert_eq!(*player.output().0.borrow(), [true, false, false]);
        assert_eq!(sched.state(), PlayerState::Idle);
        assert_eq!(sched.units_played(), 1);
    }

    #[test]
    fn test_fire_after_halt_is_noop() {
        let sched = Scheduler::new();
        let log = LogStream::new();
        let alarm = OneShot::default();
        let player = TickPlayer::new(&sched, Trace::default(), &log);

        sched.messages().push(Unit::Char(b'T')).unwrap();
        sched.arm(&alarm);
        sched.halt(&alarm);

        assert_eq!(player.fire(1_000), Reschedule::Stop);
        assert!(player.output().0.borrow().is_empty());
        assert_eq!(sched.messages().len(), 1);
    }

    #[test]
    fn test_input_while_armed_is_picked_up() {
        let sched = Scheduler::new();
        let log = LogStream::new();
        let alarm = OneShot::default();
        let player = TickPlayer::new(&sched, Trace::default(), &log);

        sched.messages().push(Unit::WordGap).unwrap();
        sched.arm(&alarm);
        assert_eq!(player.fire(0), Reschedule::After(4 * 60_000));

        // Chain still alive: arm() declines, the running chain plays it
        sched.messages().push(Unit::RawDot).unwrap();
        assert!(!sched.arm(&alarm));
        assert_eq!(player.fire(240_000), Reschedule::After(60_000));
        assert_eq!(sched.units_played(), 2);
    }

    #[test]
    fn test_alarm_return_contract() {
        assert_eq!(Reschedule::After(60_000).as_alarm_return(), -60_000);
        assert_eq!(Reschedule::Stop.as_alarm_return(), 0);
        assert_eq!(Reschedule::After(0).as_alarm_return(), -1);
    }

    #[test]
    fn test_logs_unit_expansion() {
        let sched = Scheduler::new();
        let log = LogStream::new();
        let alarm = OneShot::default();
        let player = TickPlayer::new(&sched, Trace::default(), &log);

        sched.messages().push(Unit::Char(b'K')).unwrap();
        sched.arm(&alarm);
        player.fire(5);

        let entry = log.drain().unwrap();
        assert_eq!(entry.message(), "<K> 6 ticks");
        assert_eq!(entry.timestamp_us, 5);
    }

    #[test]
    fn test_manual_on_is_not_undone_by_finishing_callback() {
        let sched = Scheduler::new();
        let rt_log = LogStream::new();
        let fg_log = LogStream::new();
        let alarm = OneShot::default();
        let led = Trace::default();
        let player = TickPlayer::new(&sched, &led, &rt_log);
        let mut interp = CommandInterpreter::new(&sched, &led, &alarm, &fg_log);

        sched.messages().push(Unit::Char(b'E')).unwrap();
        assert!(sched.arm(&alarm));

        // Operator starts `\1` while a callback is on its way out
        assert!(sched.begin_firing());
        interp.feed(b'\\', 0);
        assert_eq!(sched.state(), PlayerState::Requested);
        assert!(sched.finish_firing(false));

        assert_eq!(interp.feed(b'1', 0), Some(Ok(Outcome::ManualOn)));
        assert_eq!(sched.state(), PlayerState::Idle);
        assert_eq!(alarm.0.get(), None);
        assert!(sched.is_drained());

        // The re-arm issued by that callback lands after the halt
        assert_eq!(player.fire(1_000), Reschedule::Stop);
        assert_eq!(led.0.borrow().last(), Some(&true));
        assert_eq!(sched.state(), PlayerState::Idle);
    }

    #[test]
    fn test_drained_callback_stays_idle_for_halt() {
        let sched = Scheduler::new();
        let log = LogStream::new();
        let alarm = OneShot::default();
        let player = TickPlayer::new(&sched, Trace::default(), &log);

        sched.messages().push(Unit::Char(b'E')).unwrap();
        sched.arm(&alarm);
        player.fire(0);
        player.fire(60_000);
        assert_eq!(player.fire(240_000), Reschedule::Stop);
        assert_eq!(sched.state(), PlayerState::Idle);

        // Queued without arm(): nothing restarts behind the foreground
        sched.messages().push(Unit::Char(b'T')).unwrap();
        assert_eq!(player.fire(241_000), Reschedule::Stop);
        assert_eq!(sched.state(), PlayerState::Idle);
        assert_eq!(sched.messages().len(), 1);
    }
}
