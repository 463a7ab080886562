//! Simulated bench shared by the integration tests.
//!
//! Virtual time only: a [`ManualAlarm`] records the pending deadline and
//! [`Bench::step`] jumps the clock to it and fires the player, re-arming
//! relative to the previous deadline exactly like the hardware binding.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use morse_blinker::logging::LogStream;
use morse_blinker::{Alarm, CommandInterpreter, KeyOutput, Reschedule, Scheduler, TickPlayer};

/// Fire at most this many ticks before declaring the player stuck.
pub const MAX_STEPS: usize = 100_000;

/// Microsecond clock advanced by the bench.
#[derive(Default)]
pub struct VirtualClock(Cell<i64>);

impl VirtualClock {
    pub fn now(&self) -> i64 {
        self.0.get()
    }

    pub fn set(&self, now_us: i64) {
        self.0.set(now_us);
    }
}

/// Output that records every level change with its virtual timestamp.
pub struct RecordingOutput {
    clock: &'static VirtualClock,
    level: Cell<bool>,
    edges: RefCell<Vec<(i64, bool)>>,
}

impl RecordingOutput {
    pub fn level(&self) -> bool {
        self.level.get()
    }

    /// `(time, new_level)` for each transition.
    pub fn edges(&self) -> Vec<(i64, bool)> {
        self.edges.borrow().clone()
    }

    /// `(start, length)` of each completed on-pulse.
    pub fn pulses(&self) -> Vec<(i64, i64)> {
        let mut pulses = Vec::new();
        let mut rise = None;
        for &(t, on) in self.edges.borrow().iter() {
            match (on, rise) {
                (true, None) => rise = Some(t),
                (false, Some(start)) => {
                    pulses.push((start, t - start));
                    rise = None;
                }
                _ => {}
            }
        }
        pulses
    }

    /// Pulse lengths in dit units at `unit_us`.
    pub fn pulse_units(&self, unit_us: i64) -> Vec<i64> {
        self.pulses().iter().map(|&(_, len)| len / unit_us).collect()
    }
}

impl KeyOutput for RecordingOutput {
    fn set(&self, on: bool) {
        if self.level.replace(on) != on {
            self.edges.borrow_mut().push((self.clock.now(), on));
        }
    }
}

/// One-shot alarm holding a single pending deadline.
pub struct ManualAlarm {
    clock: &'static VirtualClock,
    next: Cell<Option<i64>>,
    arms: Cell<u32>,
    cancels: Cell<u32>,
}

impl ManualAlarm {
    pub fn pending(&self) -> Option<i64> {
        self.next.get()
    }

    pub fn arms(&self) -> u32 {
        self.arms.get()
    }

    pub fn cancels(&self) -> u32 {
        self.cancels.get()
    }
}

impl Alarm for ManualAlarm {
    fn arm_in(&self, delay_us: u32) {
        self.arms.set(self.arms.get() + 1);
        self.next.set(Some(self.clock.now() + i64::from(delay_us)));
    }

    fn cancel(&self) {
        self.cancels.set(self.cancels.get() + 1);
        self.next.set(None);
    }
}

pub type BenchInterpreter = CommandInterpreter<'static, &'static RecordingOutput, &'static ManualAlarm>;

/// Scheduler, player and interpreter wired to the virtual hardware.
pub struct Bench {
    pub sched: &'static Scheduler,
    pub clock: &'static VirtualClock,
    pub output: &'static RecordingOutput,
    pub alarm: &'static ManualAlarm,
    pub rt_log: &'static LogStream,
    pub fg_log: &'static LogStream,
    pub player: TickPlayer<'static, &'static RecordingOutput>,
    pub interp: BenchInterpreter,
}

impl Bench {
    pub fn new() -> Self {
        let sched: &'static Scheduler = Box::leak(Box::new(Scheduler::new()));
        let clock: &'static VirtualClock = Box::leak(Box::default());
        let output: &'static RecordingOutput = Box::leak(Box::new(RecordingOutput {
            clock,
            level: Cell::new(false),
            edges: RefCell::new(Vec::new()),
        }));
        let alarm: &'static ManualAlarm = Box::leak(Box::new(ManualAlarm {
            clock,
            next: Cell::new(None),
            arms: Cell::new(0),
            cancels: Cell::new(0),
        }));
        let rt_log: &'static LogStream = Box::leak(Box::new(LogStream::new()));
        let fg_log: &'static LogStream = Box::leak(Box::new(LogStream::new()));

        Self {
            sched,
            clock,
            output,
            alarm,
            rt_log,
            fg_log,
            player: TickPlayer::new(sched, output, rt_log),
            interp: CommandInterpreter::new(sched, output, alarm, fg_log),
        }
    }

    /// Feed bytes at the current virtual time.
    pub fn type_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.interp.feed(b, self.clock.now());
        }
    }

    /// Fire the pending deadline, if any. Returns `false` when nothing is
    /// armed.
    pub fn step(&mut self) -> bool {
        let Some(at) = self.alarm.next.take() else {
            return false;
        };
        self.clock.set(at);
        if let Reschedule::After(step_us) = self.player.fire(at) {
            // Deadline chain: relative to the previous scheduled instant
            if self.alarm.next.get().is_none() {
                self.alarm.next.set(Some(at + i64::from(step_us)));
            }
        }
        true
    }

    /// Fire every deadline up to and including `t`, then move the clock to `t`.
    pub fn run_until(&mut self, t: i64) {
        while let Some(at) = self.alarm.pending() {
            if at > t {
                break;
            }
            self.step();
        }
        self.clock.set(t.max(self.clock.now()));
    }

    /// Fire until the player stops. Returns the virtual time it stopped at.
    pub fn run_to_idle(&mut self) -> i64 {
        for _ in 0..MAX_STEPS {
            if !self.step() {
                return self.clock.now();
            }
        }
        panic!("player never went idle");
    }

    /// Messages from both log streams, oldest first per stream.
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for stream in [self.rt_log, self.fg_log] {
            while let Some(entry) = stream.drain() {
                lines.push(entry.message().to_string());
            }
        }
        lines
    }
}
