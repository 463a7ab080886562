//! Global log stream instances.
//!
//! One stream per execution context, so each ring has exactly one producer.

use crate::logging::LogStream;

/// Timer-callback log stream.
///
/// Single producer (tick player), single consumer (log drain).
pub static RT_LOG_STREAM: LogStream = LogStream::new();

/// Foreground log stream.
///
/// Single producer (command interpreter and main loop), single consumer (log drain).
pub static FG_LOG_STREAM: LogStream = LogStream::new();
