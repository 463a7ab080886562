//! Log output.
//!
//! Formats drained [`LogEntry`] records as text lines and writes them to any
//! `core::fmt::Write` sink: the console UART on target, stdout on host.
//!
//! Line format: `[timestamp_us] LEVEL: message`

use core::fmt::Write;

use crate::logging::{LogEntry, LogLevel, LogStream, SliceWriter};

/// Longest formatted line, including timestamp and level.
pub const MAX_LINE_LEN: usize = 128;

/// Interval between dropped-message reports.
pub const DROPPED_REPORT_INTERVAL_US: i64 = 10_000_000;

/// Format log entry into a byte buffer.
///
/// Returns the number of bytes written.
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = SliceWriter { buf, pos: 0 };

    let _ = writeln!(
        writer,
        "[{:10}] {}: {}",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.message()
    );

    writer.pos
}

/// Drains log streams into a text sink.
pub struct LogDrain {
    max_level: LogLevel,
    last_dropped_report_us: i64,
}

impl LogDrain {
    /// Drain that writes every level.
    pub const fn new() -> Self {
        Self::with_max_level(LogLevel::Trace)
    }

    /// Drain that discards entries more verbose than `max_level`.
    pub const fn with_max_level(max_level: LogLevel) -> Self {
        Self {
            max_level,
            last_dropped_report_us: 0,
        }
    }

    /// Drain every pending entry of `streams`, in order, into `out`.
    ///
    /// Filtered entries are consumed too.
    /// Every `DROPPED_REPORT_INTERVAL_US`, reports and resets the drop
    /// counters. Returns the number of entries written.
    pub fn drain_into<W: Write>(
        &mut self,
        streams: &[&LogStream],
        now_us: i64,
        out: &mut W,
    ) -> usize {
        let mut line = [0u8; MAX_LINE_LEN];
        let mut written = 0;

        for stream in streams {
            while let Some(entry) = stream.drain() {
                if entry.level > self.max_level {
                    continue;
                }
                let len = format_log_entry(&entry, &mut line);
                if let Ok(text) = core::str::from_utf8(&line[..len]) {
                    let _ = out.write_str(text);
                }
                written += 1;
            }
        }

        if now_us - self.last_dropped_report_us > DROPPED_REPORT_INTERVAL_US {
            for (idx, stream) in streams.iter().enumerate() {
                let dropped = stream.dropped();
                if dropped > 0 {
                    let _ = writeln!(out, "[WARN] Dropped: stream {}={}", idx, dropped);
                    stream.reset_dropped();
                }
            }
            self.last_dropped_report_us = now_us;
        }

        written
    }
}

impl Default for LogDrain {
    fn default() -> Self {
        Self::new()
    }
}
