//! Anomaly tracking for MorseBlinker.
//!
//! Nothing here stops playback. Every condition the blinker tolerates
//! (a dropped keystroke, an untranslatable symbol, a late timer firing, a
//! rejected speed) is latched with its data and counted, so the foreground
//! can log it and diagnostics can read it later.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Anomaly codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No anomaly recorded.
    None = 0,

    /// Message queue full: the typed unit was dropped.
    /// Data: the rejected byte.
    QueueFull = 1,

    /// Symbol has no Morse representation; consumed silently.
    /// Data: the symbol byte.
    UnsupportedSymbol = 2,

    /// Timer fired after the following deadline had already passed.
    /// Data: lateness in µs.
    LateFiring = 3,

    /// Operator speed outside the accepted range; previous speed kept.
    /// Data: the entered value.
    SpeedRejected = 4,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::QueueFull,
            2 => FaultCode::UnsupportedSymbol,
            3 => FaultCode::LateFiring,
            4 => FaultCode::SpeedRejected,
            _ => FaultCode::None,
        }
    }

    /// Short name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::None => "none",
            FaultCode::QueueFull => "queue full",
            FaultCode::UnsupportedSymbol => "unsupported symbol",
            FaultCode::LateFiring => "late firing",
            FaultCode::SpeedRejected => "speed rejected",
        }
    }
}

/// Thread-safe anomaly latch.
///
/// Written from both the foreground and the timer callback.
///
/// # Usage
///
/// ```ignore
/// static FAULT: FaultState = FaultState::new();
///
/// // In the timer callback:
/// if rearm.late_us > 0 {
///     FAULT.set(FaultCode::LateFiring, rearm.late_us);
/// }
///
/// // In the foreground loop:
/// if let Some(report) = FAULT.take() {
///     rt_warn!(FG_LOG_STREAM, now_us, "{}", report);
/// }
/// ```
pub struct FaultState {
    /// True if an anomaly is latched and not yet acknowledged.
    active: AtomicBool,

    /// Most recent code.
    code: AtomicU8,

    /// Additional data for the most recent code.
    data: AtomicU32,

    /// Total anomaly count since boot (never cleared).
    count: AtomicU32,

    /// Per-code counters, indexed by `FaultCode as usize`.
    per_code: [AtomicU32; 5],
}

impl FaultState {
    /// Create new fault state (nothing latched).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
            per_code: [const { AtomicU32::new(0) }; 5],
        }
    }

    /// Latch an anomaly and bump its counters.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.per_code.get(code as usize) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        self.active.store(true, Ordering::Release);
    }

    /// Check if an anomaly is latched.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Most recent code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Data attached to the most recent code.
    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Total anomaly count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Count of one specific code since boot.
    #[inline]
    pub fn count_of(&self, code: FaultCode) -> u32 {
        self.per_code
            .get(code as usize)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Acknowledge the latched anomaly.
    ///
    /// Note: This clears the active flag but does NOT reset the counters.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Acknowledge the latched anomaly and return it, if any.
    #[inline]
    pub fn take(&self) -> Option<FaultReport> {
        if !self.active.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(FaultReport {
            code: self.code(),
            data: self.data(),
            count: self.count(),
        })
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Latched anomaly as returned by [`FaultState::take`].
///
/// A burst of anomalies between two reads is reported once, with the data
/// of the last one; `count` tells how many there were in total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultReport {
    pub code: FaultCode,
    pub data: u32,
    /// Total anomalies since boot.
    pub count: u32,
}

impl core::fmt::Display for FaultReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.code {
            FaultCode::QueueFull | FaultCode::UnsupportedSymbol => write!(
                f,
                "{} '{}' (total {})",
                self.code.as_str(),
                char::from(self.data as u8).escape_default(),
                self.count
            ),
            FaultCode::LateFiring => {
                write!(f, "{} by {} us (total {})", self.code.as_str(), self.data, self.count)
            }
            _ => write!(f, "{} {} (total {})", self.code.as_str(), self.data, self.count),
        }
    }
}
