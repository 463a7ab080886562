//! Module: unit
//!
//! Purpose: Queue item types. A [`Unit`] is one logical item waiting in the
//! message queue; a [`Tick`] is one timed on/off instruction waiting in the
//! tick queue.
//!
//! Architecture:
//! - Both types pack into a single byte so queue slots can be plain `AtomicU8`
//! - Raw operator tokens carry bit 7 so they never collide with ASCII text
//! - Tick durations are in dit units, scaled by the current speed at playback
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Byte encodings shared by ring slots.
///
/// Implementors must round-trip every value producers create:
/// `from_byte(x.to_byte()) == x`.
pub trait Slot: Copy {
    /// Pack into one byte.
    fn to_byte(self) -> u8;
    /// Unpack from one byte. Total: every byte maps to some value.
    fn from_byte(byte: u8) -> Self;
}

/// Raw-token marker bit.
pub const RAW_FLAG: u8 = 0x80;

/// One queued item in the message queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    /// Symbol to encode through the Morse table (already uppercased).
    Char(u8),
    /// Pause between words.
    WordGap,
    /// Operator-injected dot.
    RawDot,
    /// Operator-injected dash.
    RawDash,
    /// Operator-injected pause.
    RawGap,
}

impl Unit {
    /// Printable tag for logs.
    pub fn label(self) -> char {
        match self {
            Unit::Char(c) if c.is_ascii_graphic() => c as char,
            Unit::Char(_) => '?',
            Unit::WordGap => ' ',
            Unit::RawDot => '.',
            Unit::RawDash => '-',
            Unit::RawGap => '_',
        }
    }

    /// True for operator-injected tokens.
    pub fn is_raw(self) -> bool {
        matches!(self, Unit::RawDot | Unit::RawDash | Unit::RawGap)
    }
}

impl Slot for Unit {
    #[inline]
    fn to_byte(self) -> u8 {
        match self {
            Unit::Char(c) if c & RAW_FLAG == 0 => c,
            // Non-ASCII never reaches the queue through the input gate; keep
            // it from aliasing a raw token.
            Unit::Char(_) => 0xFF,
            Unit::WordGap => b' ',
            Unit::RawDot => b'.' | RAW_FLAG,
            Unit::RawDash => b'-' | RAW_FLAG,
            Unit::RawGap => b' ' | RAW_FLAG,
        }
    }

    #[inline]
    fn from_byte(byte: u8) -> Self {
        const RAW_DOT: u8 = b'.' | RAW_FLAG;
        const RAW_DASH: u8 = b'-' | RAW_FLAG;
        const RAW_GAP: u8 = b' ' | RAW_FLAG;
        match byte {
            b' ' => Unit::WordGap,
            RAW_DOT => Unit::RawDot,
            RAW_DASH => Unit::RawDash,
            RAW_GAP => Unit::RawGap,
            // Unknown raw codes fall through to the table, which ignores them.
            other => Unit::Char(other),
        }
    }
}

/// Output level of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Off,
    On,
}

impl Level {
    #[inline]
    pub fn is_on(self) -> bool {
        self == Level::On
    }
}

impl From<bool> for Level {
    fn from(on: bool) -> Self {
        if on {
            Level::On
        } else {
            Level::Off
        }
    }
}

/// One scheduled pulse: drive `level` for `duration` dit units.
///
/// Memory layout:
/// ```text
/// [level:1][reserved:3][duration:4]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub level: Level,
    pub duration: u8,
}

/// Level bit in the packed form.
const TICK_LEVEL_BIT: u8 = 0x80;

/// Duration nibble in the packed form.
const TICK_DURATION_MASK: u8 = 0x0F;

/// Longest duration a tick can carry.
pub const MAX_TICK_DURATION: u8 = TICK_DURATION_MASK;

impl Tick {
    /// Dot: on for 1.
    pub const DOT: Self = Self::new(Level::On, 1);
    /// Dash: on for 3.
    pub const DASH: Self = Self::new(Level::On, 3);
    /// Gap between elements of one character.
    pub const ELEMENT_GAP: Self = Self::new(Level::Off, 1);
    /// Extra silence of a raw gap token.
    pub const RAW_GAP: Self = Self::new(Level::Off, 2);
    /// Gap after the last element of a character.
    pub const LETTER_GAP: Self = Self::new(Level::Off, 3);
    /// Pause for a space between words.
    pub const WORD_GAP: Self = Self::new(Level::Off, 4);

    /// Create a tick. Durations are clamped into `1..=15`.
    pub const fn new(level: Level, duration: u8) -> Self {
        let duration = if duration == 0 {
            1
        } else if duration > MAX_TICK_DURATION {
            MAX_TICK_DURATION
        } else {
            duration
        };
        Self { level, duration }
    }

    /// Tick length in microseconds at the given dit length.
    #[inline]
    pub const fn duration_us(&self, unit_us: u32) -> u32 {
        self.duration as u32 * unit_us
    }
}

impl Slot for Tick {
    #[inline]
    fn to_byte(self) -> u8 {
        let level = if self.level.is_on() { TICK_LEVEL_BIT } else { 0 };
        level | (self.duration & TICK_DURATION_MASK)
    }

    #[inline]
    fn from_byte(byte: u8) -> Self {
        Tick::new(
            Level::from(byte & TICK_LEVEL_BIT != 0),
            byte & TICK_DURATION_MASK,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
