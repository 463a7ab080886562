//! UART console: operator input and log output.
//!
//! One [`UartDriver`] serves both directions. Input is polled without
//! waiting; log lines are written from the foreground loop only.

use core::fmt;

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::gpio::{self, InputPin, OutputPin};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, Uart, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::EspError;

use crate::io::InputSource;

/// Console UART driver.
pub struct UartConsole {
    driver: UartDriver<'static>,
}

impl UartConsole {
    pub fn new(
        uart: impl Peripheral<P = impl Uart> + 'static,
        tx_pin: impl Peripheral<P = impl OutputPin> + 'static,
        rx_pin: impl Peripheral<P = impl InputPin> + 'static,
        baud_rate: u32,
    ) -> Result<Self, EspError> {
        let config = uart::config::Config::default().baudrate(Hertz(baud_rate));
        let driver = UartDriver::new(
            uart,
            tx_pin,
            rx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &config,
        )?;
        Ok(Self { driver })
    }

    /// Operator byte source.
    pub fn input(&self) -> UartInput<'_> {
        UartInput {
            driver: &self.driver,
        }
    }

    /// Log line sink.
    pub fn writer(&self) -> UartWriter<'_> {
        UartWriter {
            driver: &self.driver,
        }
    }
}

/// Non-blocking byte reader on the console UART.
pub struct UartInput<'a> {
    driver: &'a UartDriver<'static>,
}

impl InputSource for UartInput<'_> {
    fn poll(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.driver.read(&mut byte, NON_BLOCK) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}

/// `core::fmt::Write` sink on the console UART.
pub struct UartWriter<'a> {
    driver: &'a UartDriver<'static>,
}

impl fmt::Write for UartWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.driver
            .write(s.as_bytes())
            .map(|_| ())
            .map_err(|_| fmt::Error)
    }
}
