//! Unit expander.
//!
//! Turns one queued [`Unit`] into the burst of [`Tick`]s that plays it.
//! Pure translation lives in [`expand`]; [`refill`] moves units from the
//! message queue into an empty tick queue.
//!
//! # Timing (dit units)
//!
//! ```text
//! Char  E (.)    on1 off3
//! Char  A (.-)   on1 off1 on3 off3
//! WordGap        off4
//! RawDot         on1 off1
//! RawDash        on3 off1
//! RawGap         off2 off1
//! ```
//!
//! The last gap of a character is emitted as a letter gap directly; nothing
//! already queued is ever rewritten.

use crate::fault::FaultCode;
use crate::morse::{self, Element, MAX_ELEMENTS};
use crate::scheduler::Scheduler;
use crate::unit::{Tick, Unit};

/// Most ticks one unit can expand to: one element plus one gap per bit.
pub const MAX_BURST: usize = 2 * MAX_ELEMENTS;

/// Ticks produced for one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickBurst {
    ticks: [Tick; MAX_BURST],
    len: u8,
}

impl TickBurst {
    const fn empty() -> Self {
        Self {
            ticks: [Tick::ELEMENT_GAP; MAX_BURST],
            len: 0,
        }
    }

    fn push(&mut self, tick: Tick) {
        if let Some(slot) = self.ticks.get_mut(self.len as usize) {
            *slot = tick;
            self.len += 1;
        }
    }

    /// Ticks in playback order.
    #[inline]
    pub fn as_slice(&self) -> &[Tick] {
        &self.ticks[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sum of all durations, in dit units.
    pub fn total_units(&self) -> u32 {
        self.as_slice().iter().map(|t| t.duration as u32).sum()
    }
}

/// Translate one unit into its ticks.
///
/// Symbols without a Morse representation yield an empty burst.
pub fn expand(unit: Unit) -> TickBurst {
    let mut burst = TickBurst::empty();

    match unit {
        Unit::Char(symbol) => {
            let code = morse::lookup(symbol);
            let mut elements = code.elements();
            while let Some(element) = elements.next() {
                burst.push(match element {
                    Element::Dit => Tick::DOT,
                    Element::Dah => Tick::DASH,
                });
                burst.push(if elements.len() == 0 {
                    Tick::LETTER_GAP
                } else {
                    Tick::ELEMENT_GAP
                });
            }
        }
        Unit::WordGap => burst.push(Tick::WORD_GAP),
        Unit::RawDash => {
            burst.push(Tick::DASH);
            burst.push(Tick::ELEMENT_GAP);
        }
        Unit::RawDot => {
            burst.push(Tick::DOT);
            burst.push(Tick::ELEMENT_GAP);
        }
        Unit::RawGap => {
            burst.push(Tick::RAW_GAP);
            burst.push(Tick::ELEMENT_GAP);
        }
    }

    burst
}

/// Result of a refill attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refill {
    /// Message queue empty: nothing left to play.
    Drained,
    /// `unit` was dequeued and `ticks` ticks appended.
    Loaded { unit: Unit, ticks: usize },
}

/// Load the next playable unit into the (empty) tick queue.
///
/// Consumes message units until one produces ticks or the queue runs dry.
/// Unsupported symbols are consumed, counted in diagnostics and skipped.
/// Call only from the timer context, with the tick queue empty.
pub fn refill(sched: &Scheduler) -> Refill {
    while let Some(unit) = sched.messages().pop() {
        let burst = expand(unit);
        if burst.is_empty() {
            if let Unit::Char(symbol) = unit {
                sched.fault().set(FaultCode::UnsupportedSymbol, symbol as u32);
            }
            continue;
        }

        for &tick in burst.as_slice() {
            // Capacity covers MAX_BURST; an empty queue cannot overflow.
            let _ = sched.ticks().push(tick);
        }
        sched.note_unit_played();
        return Refill::Loaded {
            unit,
            ticks: burst.len(),
        };
    }
    Refill::Drained
}
