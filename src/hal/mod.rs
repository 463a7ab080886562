//! Hardware Abstraction Layer for MorseBlinker.
//!
//! Thin wrappers around ESP-IDF peripherals implementing the [`crate::io`]
//! traits. Business logic stays in core modules, HAL is just I/O.

pub mod console;
pub mod gpio;
pub mod timer;

use esp_idf_svc::hal::gpio::OutputPin;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::sys::EspError;

use crate::config::HardwareConfig;

pub use console::{UartConsole, UartInput, UartWriter};
pub use gpio::KeyLines;
pub use timer::{EspAlarm, TimerContext};

/// Drivers for everything the blinker touches.
pub struct Board {
    pub lines: KeyLines,
    pub console: UartConsole,
}

impl Board {
    /// Take the peripherals and set up the output lines and the console.
    ///
    /// Pin choice is per chip and matches [`HardwareConfig::default`].
    pub fn take(config: &HardwareConfig) -> Result<Self, EspError> {
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        // LED, key line, console TX, console RX
        #[cfg(not(feature = "esp32p4"))]
        let (led, key, tx, rx) = (pins.gpio48, pins.gpio4, pins.gpio43, pins.gpio44);
        #[cfg(feature = "esp32p4")]
        let (led, key, tx, rx) = (pins.gpio23, pins.gpio4, pins.gpio37, pins.gpio38);

        let key = config.key_pin.map(|_| key.downgrade_output());
        let lines = KeyLines::new(led.downgrade_output(), key)?;
        let console = UartConsole::new(peripherals.uart0, tx, rx, config.console_baud)?;

        Ok(Self { lines, console })
    }
}

/// Microseconds since boot.
#[inline]
pub fn now_us() -> i64 {
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}
