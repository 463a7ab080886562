//! GPIO HAL for the LED and key output lines.

use std::sync::{Mutex, PoisonError};

use esp_idf_svc::hal::gpio::{AnyOutputPin, Level, Output, PinDriver};
use esp_idf_svc::sys::EspError;

use crate::io::KeyOutput;

type Line = PinDriver<'static, AnyOutputPin, Output>;

/// LED plus optional key line, switched together.
///
/// Shared by the timer callback and the foreground; each driver sits behind
/// a mutex held only for the level write.
pub struct KeyLines {
    led: Mutex<Line>,
    key: Option<Mutex<Line>>,
}

impl KeyLines {
    /// Take both pins as push-pull outputs, driven low.
    pub fn new(led: AnyOutputPin, key: Option<AnyOutputPin>) -> Result<Self, EspError> {
        Ok(Self {
            led: Mutex::new(output_low(led)?),
            key: key.map(output_low).transpose()?.map(Mutex::new),
        })
    }
}

fn output_low(pin: AnyOutputPin) -> Result<Line, EspError> {
    let mut line = PinDriver::output(pin)?;
    line.set_low()?;
    Ok(line)
}

impl KeyOutput for KeyLines {
    fn set(&self, on: bool) {
        let level = Level::from(on);
        for line in core::iter::once(&self.led).chain(self.key.as_ref()) {
            let mut line = line.lock().unwrap_or_else(PoisonError::into_inner);
            // Only fails for pins not in output mode, ruled out by new()
            let _ = line.set_level(level);
        }
    }
}
