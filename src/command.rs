//! Command interpreter.
//!
//! Foreground state machine over operator bytes. Plain text is queued for
//! playback; a backslash starts a command:
//!
//! ```text
//! \S<digits>\n   set speed (WPM)
//! \-  \.  \␠     raw dash, dot, gap
//! \1  \0         output on / off now, discard pending work
//! ^U (0x15)      cancel: discard pending work, output off
//! DEL (0x7F)     remove last queued unit, else abort current character
//! ```
//!
//! After every processed byte the player is started if work is waiting.

use crate::config::unit_us_for;
use crate::error::CommandError;
use crate::fault::FaultCode;
use crate::io::{Alarm, InputSource, KeyOutput};
use crate::logging::LogStream;
use crate::scheduler::Scheduler;
use crate::unit::{Slot, Unit};
use crate::{rt_debug, rt_info, rt_trace, rt_warn};

/// Starts a command.
pub const ESCAPE: u8 = b'\\';
/// Ctrl+U: flush everything.
pub const CANCEL: u8 = 0x15;
/// Backspace as sent by terminals.
pub const DELETE: u8 = 0x7F;

/// Interpreter state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandMode {
    Idle,
    /// Got `\`
    AwaitingCommandChar,
    /// Got `\S`, collecting digits
    EnteringSpeed,
}

/// What a processed byte did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Byte had no effect (line ending or delete with nothing to delete).
    Ignored,
    /// Unit appended to the message queue.
    Queued(Unit),
    /// `\` received.
    CommandStarted,
    /// `\S` received.
    SpeedEntry,
    /// Speed digit accumulated.
    SpeedDigit,
    /// New speed committed.
    SpeedSet(u16),
    /// Both queues discarded, output off.
    Flushed,
    /// Newest queued unit removed.
    Removed(Unit),
    /// Character in progress discarded, output off.
    Aborted,
    /// Output forced on, queues discarded.
    ManualOn,
    /// Output forced off, queues discarded.
    ManualOff,
}

/// True for bytes the interpreter looks at; everything else is dropped
/// before reaching the state machine.
#[inline]
pub const fn accepts(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7F | b'\n' | b'\r' | CANCEL)
}

/// Foreground half of the blinker.
pub struct CommandInterpreter<'a, O: KeyOutput, A: Alarm> {
    sched: &'a Scheduler,
    out: O,
    alarm: A,
    log: &'a LogStream,
    mode: CommandMode,
    speed_acc: u32,
}

impl<'a, O: KeyOutput, A: Alarm> CommandInterpreter<'a, O, A> {
    pub fn new(sched: &'a Scheduler, out: O, alarm: A, log: &'a LogStream) -> Self {
        Self {
            sched,
            out,
            alarm,
            log,
            mode: CommandMode::Idle,
            speed_acc: 0,
        }
    }

    #[inline]
    pub fn mode(&self) -> CommandMode {
        self.mode
    }

    pub fn scheduler(&self) -> &'a Scheduler {
        self.sched
    }

    /// Drain every byte `input` has ready. Returns how many were read.
    pub fn poll<I: InputSource>(&mut self, input: &mut I, now_us: i64) -> usize {
        let mut count = 0;
        while let Some(byte) = input.poll() {
            self.feed(byte, now_us);
            count += 1;
        }
        count
    }

    /// Process one raw input byte: gate, interpret, log, start the player.
    ///
    /// Returns `None` for bytes rejected by the input gate.
    pub fn feed(&mut self, byte: u8, now_us: i64) -> Option<Result<Outcome, CommandError>> {
        if !accepts(byte) {
            return None;
        }

        let result = self.process_byte(byte);
        self.report(&result, now_us);

        if self.sched.arm(&self.alarm) {
            rt_trace!(self.log, now_us, "player started");
        }
        Some(result)
    }

    /// Run the state machine on one byte. Does not start the player.
    pub fn process_byte(&mut self, byte: u8) -> Result<Outcome, CommandError> {
        match self.mode {
            CommandMode::Idle => self.process_idle(byte),
            CommandMode::AwaitingCommandChar => {
                self.mode = CommandMode::Idle;
                self.process_command(byte)
            }
            CommandMode::EnteringSpeed => self.process_speed(byte),
        }
    }

    fn process_idle(&mut self, byte: u8) -> Result<Outcome, CommandError> {
        match byte {
            b'\n' | b'\r' => Ok(Outcome::Ignored),

            ESCAPE => {
                self.mode = CommandMode::AwaitingCommandChar;
                Ok(Outcome::CommandStarted)
            }

            CANCEL => {
                self.sched.flush_all(&self.alarm, &self.out, false);
                Ok(Outcome::Flushed)
            }

            DELETE => {
                if let Some(unit) = self.sched.messages().retract() {
                    Ok(Outcome::Removed(unit))
                } else if !self.sched.ticks().is_empty() {
                    self.sched.abort_playback(&self.alarm, &self.out);
                    Ok(Outcome::Aborted)
                } else {
                    Ok(Outcome::Ignored)
                }
            }

            b' ' => self.enqueue(Unit::WordGap),

            _ => self.enqueue(Unit::Char(byte.to_ascii_uppercase())),
        }
    }

    fn process_command(&mut self, byte: u8) -> Result<Outcome, CommandError> {
        match byte {
            b'S' => {
                self.mode = CommandMode::EnteringSpeed;
                self.speed_acc = 0;
                Ok(Outcome::SpeedEntry)
            }
            b'-' => self.enqueue(Unit::RawDash),
            b'.' => self.enqueue(Unit::RawDot),
            b' ' => self.enqueue(Unit::RawGap),
            b'1' => {
                self.sched.flush_all(&self.alarm, &self.out, true);
                Ok(Outcome::ManualOn)
            }
            b'0' => {
                self.sched.flush_all(&self.alarm, &self.out, false);
                Ok(Outcome::ManualOff)
            }
            _ => Err(CommandError::UnknownCommand),
        }
    }

    fn process_speed(&mut self, byte: u8) -> Result<Outcome, CommandError> {
        match byte {
            b'0'..=b'9' => {
                self.speed_acc = self
                    .speed_acc
                    .saturating_mul(10)
                    .saturating_add(u32::from(byte - b'0'));
                Ok(Outcome::SpeedDigit)
            }
            b'\n' | b'\r' => {
                self.mode = CommandMode::Idle;
                let wpm = self.speed_acc;
                if self.sched.speed().set_wpm(wpm) {
                    Ok(Outcome::SpeedSet(self.sched.speed().wpm()))
                } else {
                    self.sched.fault().set(FaultCode::SpeedRejected, wpm);
                    Err(CommandError::SpeedOutOfRange)
                }
            }
            _ => {
                self.mode = CommandMode::Idle;
                Err(CommandError::SpeedAborted)
            }
        }
    }

    fn enqueue(&mut self, unit: Unit) -> Result<Outcome, CommandError> {
        match self.sched.messages().push(unit) {
            Ok(()) => Ok(Outcome::Queued(unit)),
            Err(_) => {
                self.sched
                    .fault()
                    .set(FaultCode::QueueFull, u32::from(unit.to_byte()));
                Err(CommandError::QueueFull)
            }
        }
    }

    fn report(&self, result: &Result<Outcome, CommandError>, now_us: i64) {
        match *result {
            Ok(Outcome::Queued(unit)) => rt_trace!(self.log, now_us, "queued <{}>", unit.label()),
            Ok(Outcome::SpeedSet(wpm)) => rt_info!(
                self.log,
                now_us,
                "speed: {} WPM ({} us/unit)",
                wpm,
                unit_us_for(wpm)
            ),
            Ok(Outcome::Flushed) => rt_info!(self.log, now_us, "flushed"),
            Ok(Outcome::Removed(unit)) => {
                rt_debug!(self.log, now_us, "removed <{}>", unit.label())
            }
            Ok(Outcome::Aborted) => rt_info!(self.log, now_us, "character aborted"),
            Ok(Outcome::ManualOn) => rt_info!(self.log, now_us, "manual on"),
            Ok(Outcome::ManualOff) => rt_info!(self.log, now_us, "manual off"),
            Ok(_) => {}
            Err(e) => rt_warn!(self.log, now_us, "{}", e),
        }
    }
}
