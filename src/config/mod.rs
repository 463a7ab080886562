//! Module: config
//!
//! Purpose: Configuration for MorseBlinker. Compile-time sizing constants,
//! the runtime speed block and the pin map.
//!
//! Architecture:
//! - Sizing and timing constants are `const`, fixed at build time
//! - Playback speed is the only runtime-mutable parameter (atomics, lock-free)
//! - Nothing is persisted: every value is reinitialized at boot
//!
//! Safety: RT-safe. All runtime access via atomics, no locks.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

/// Microseconds in one PARIS dit at 1 WPM.
pub const PARIS_DIT_US_AT_1_WPM: u32 = 1_200_000;

/// Speed at boot.
pub const DEFAULT_WPM: u16 = 20;

/// Slowest speed accepted from the operator.
pub const MIN_WPM: u16 = 1;

/// Fastest speed accepted from the operator.
pub const MAX_WPM: u16 = 200;

/// Delay between arming an idle player and its first firing.
pub const START_DELAY_US: u32 = 1_000;

/// Message queue slots (power of 2). One slot stays free to tell full from empty.
pub const MESSAGE_QUEUE_SIZE: usize = 256;

/// Tick queue slots (power of 2). Must hold the longest character burst.
pub const TICK_QUEUE_SIZE: usize = 16;

/// Unit length in microseconds for a given speed.
///
/// `wpm` must be non-zero; callers validate with [`wpm_in_range`] first.
#[inline]
pub const fn unit_us_for(wpm: u16) -> u32 {
    PARIS_DIT_US_AT_1_WPM / wpm as u32
}

/// Check an operator-entered speed against the accepted range.
#[inline]
pub const fn wpm_in_range(wpm: u32) -> bool {
    wpm >= MIN_WPM as u32 && wpm <= MAX_WPM as u32
}

/// Playback speed shared between the interpreter (writer) and the player (reader).
///
/// `wpm` and `unit_us` are stored separately so the timer callback never
/// divides. Readers may observe the new `unit_us` one tick before `wpm`;
/// only `unit_us` drives timing.
pub struct Speed {
    wpm: AtomicU16,
    unit_us: AtomicU32,
}

impl Speed {
    /// Speed block at [`DEFAULT_WPM`].
    pub const fn new() -> Self {
        Self {
            wpm: AtomicU16::new(DEFAULT_WPM),
            unit_us: AtomicU32::new(unit_us_for(DEFAULT_WPM)),
        }
    }

    /// Current speed in words per minute.
    #[inline]
    pub fn wpm(&self) -> u16 {
        self.wpm.load(Ordering::Relaxed)
    }

    /// Current dit length in microseconds.
    #[inline]
    pub fn unit_us(&self) -> u32 {
        self.unit_us.load(Ordering::Relaxed)
    }

    /// Set a new speed.
    ///
    /// Returns `false` and keeps the previous speed if `wpm` is outside
    /// `MIN_WPM..=MAX_WPM`.
    pub fn set_wpm(&self, wpm: u32) -> bool {
        if !wpm_in_range(wpm) {
            return false;
        }
        let wpm = wpm as u16;
        self.unit_us.store(unit_us_for(wpm), Ordering::Relaxed);
        self.wpm.store(wpm, Ordering::Relaxed);
        true
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin and console assignment for the hardware bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardwareConfig {
    /// On-board LED.
    pub led_pin: i32,
    /// External key line, driven together with the LED.
    pub key_pin: Option<i32>,
    /// UART0 TX, operator console.
    pub console_tx_pin: i32,
    /// UART0 RX, operator console.
    pub console_rx_pin: i32,
    /// Console baud rate.
    pub console_baud: u32,
}

impl Default for HardwareConfig {
    #[cfg(not(feature = "esp32p4"))]
    fn default() -> Self {
        Self {
            led_pin: 48, // ESP32-S3-DevKitC RGB LED data pin, usable as plain GPIO
            key_pin: Some(4),
            console_tx_pin: 43,
            console_rx_pin: 44,
            console_baud: 115_200,
        }
    }

    #[cfg(feature = "esp32p4")]
    fn default() -> Self {
        Self {
            led_pin: 23,
            key_pin: Some(4),
            console_tx_pin: 37,
            console_rx_pin: 38,
            console_baud: 115_200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_speed() {
        let speed = Speed::new();
        assert_eq!(speed.wpm(), 20);
        assert_eq!(speed.unit_us(), 60_000);
    }

    #[test]
    fn test_set_wpm_recomputes_unit() {
        let speed = Speed::new();
        assert!(speed.set_wpm(60));
        assert_eq!(speed.wpm(), 60);
        assert_eq!(speed.unit_us(), 20_000);
    }

    #[test]
    fn test_zero_wpm_rejected() {
        let speed = Speed::new();
        assert!(!speed.set_wpm(0));
        assert_eq!(speed.wpm(), DEFAULT_WPM);
        assert_eq!(speed.unit_us(), 60_000);
    }

    #[test]
    fn test_limits() {
        assert!(wpm_in_range(MIN_WPM as u32));
        assert!(wpm_in_range(MAX_WPM as u32));
        assert!(!wpm_in_range(MAX_WPM as u32 + 1));
        assert!(!wpm_in_range(70_000));
    }

    #[test]
    fn test_queue_sizes_are_powers_of_two() {
        assert!(MESSAGE_QUEUE_SIZE.is_power_of_two());
        assert!(TICK_QUEUE_SIZE.is_power_of_two());
    }
}
