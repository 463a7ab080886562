//! Command error types

/// Rejected input, with code and message.
///
/// Errors are logged, never echoed: the operator only sees the LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// E01: Message queue full, unit dropped
    QueueFull,
    /// E02: Unknown character after the escape
    UnknownCommand,
    /// E03: Non-digit inside a speed entry
    SpeedAborted,
    /// E04: Speed outside the accepted range
    SpeedOutOfRange,
}

impl CommandError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueueFull => "E01",
            Self::UnknownCommand => "E02",
            Self::SpeedAborted => "E03",
            Self::SpeedOutOfRange => "E04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::QueueFull => "queue full",
            Self::UnknownCommand => "unknown command",
            Self::SpeedAborted => "speed entry aborted",
            Self::SpeedOutOfRange => "speed out of range",
        }
    }
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}
