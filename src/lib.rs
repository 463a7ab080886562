//! # MorseBlinker
//!
//! Blinks typed text as Morse code on an LED and a key line.
//!
//! ## Architecture
//!
//! Two contexts share one [`Scheduler`]:
//! - Foreground: [`CommandInterpreter`] turns input bytes into queued units
//!   and commands.
//! - Timer callback: [`TickPlayer`] expands units into ticks and plays one
//!   tick per firing, returning the next relative deadline.
//!
//! ```text
//! input ─▶ CommandInterpreter ─▶ MessageQueue ─▶ expander ─▶ TickQueue ─▶ TickPlayer ─▶ LED
//!          (foreground)             (SPSC)        └──── timer callback ────┘
//! ```
//!
//! The core takes no locks and never allocates or blocks. Hardware is only
//! reached through the [`io`] traits.

#![cfg_attr(not(test), no_std)]

// ESP-IDF ships std; the drivers in `hal` share pins through its Mutex
#[cfg(all(not(test), target_os = "espidf"))]
extern crate std;

pub mod config;
pub mod morse;
pub mod unit;
pub mod ring;
pub mod expander;
pub mod scheduler;
pub mod player;
pub mod deadline;
pub mod command;
pub mod error;
pub mod io;
pub mod fault;
pub mod logging;
pub mod log_globals;
pub mod uart_logger;

#[cfg(target_os = "espidf")]
pub mod hal;

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

pub use command::{CommandInterpreter, CommandMode, Outcome};
pub use config::Speed;
pub use deadline::DeadlineChain;
pub use error::CommandError;
pub use fault::{FaultCode, FaultState};
pub use io::{Alarm, InputSource, KeyOutput};
pub use player::{Reschedule, TickPlayer};
pub use scheduler::{PlayerState, Scheduler};
pub use unit::{Level, Tick, Unit};
