//! Interfaces to the outside world.
//!
//! Core logic only talks to hardware through these three traits. The
//! ESP-IDF bindings live in `hal`, the host simulator in `main.rs`, and the
//! test bench in `tests/common`.

/// Digital output driven by the player and by manual on/off commands.
///
/// Takes `&self`: the timer callback and the foreground both drive it, and a
/// single level write is atomic on every supported target.
pub trait KeyOutput {
    /// Drive the output: `true` = active (LED lit, key down).
    fn set(&self, on: bool);
}

/// One-shot timer that starts the tick player's callback chain.
///
/// Re-arming after each firing is the binding's job, using the value the
/// player returns; the foreground only arms the first firing and cancels.
pub trait Alarm {
    /// Schedule the first firing `delay_us` from now.
    fn arm_in(&self, delay_us: u32);

    /// Drop the pending firing, if any.
    fn cancel(&self);
}

/// Non-blocking byte source for operator input.
pub trait InputSource {
    /// Next byte, or `None` if nothing is waiting. Never blocks.
    fn poll(&mut self) -> Option<u8>;
}

impl<T: KeyOutput + ?Sized> KeyOutput for &T {
    #[inline]
    fn set(&self, on: bool) {
        (**self).set(on);
    }
}

impl<T: Alarm + ?Sized> Alarm for &T {
    #[inline]
    fn arm_in(&self, delay_us: u32) {
        (**self).arm_in(delay_us);
    }

    #[inline]
    fn cancel(&self) {
        (**self).cancel();
    }
}
