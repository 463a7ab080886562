//! `esp_timer` binding for the tick player.
//!
//! One one-shot `esp_timer` in task dispatch mode. Every firing runs
//! [`TickPlayer::fire`] and re-arms the same timer relative to the previous
//! deadline through a [`DeadlineChain`].
//!
//! A one-shot timer holds at most one pending firing, so a re-arm racing a
//! `halt()` leaves a single stale firing at worst, which finds the player
//! idle and does nothing.

use core::ffi::c_void;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use esp_idf_svc::sys::{
    esp, esp_timer, esp_timer_create, esp_timer_create_args_t,
    esp_timer_dispatch_t_ESP_TIMER_TASK, esp_timer_get_time, esp_timer_handle_t,
    esp_timer_start_once, esp_timer_stop, EspError,
};

use crate::deadline::DeadlineChain;
use crate::fault::{FaultCode, FaultState};
use crate::io::{Alarm, KeyOutput};
use crate::log_globals::RT_LOG_STREAM;
use crate::player::{Reschedule, TickPlayer};
use crate::rt_warn;

/// Lateness worth a log line and a fault count.
const LATE_WARN_US: u32 = 1_000;

/// Everything the timer callback needs. Must outlive the timer.
pub struct TimerContext<O: KeyOutput> {
    player: TickPlayer<'static, O>,
    chain: DeadlineChain,
    fault: &'static FaultState,
    handle: AtomicPtr<esp_timer>,
}

impl<O: KeyOutput> TimerContext<O> {
    pub fn new(player: TickPlayer<'static, O>, fault: &'static FaultState) -> Self {
        Self {
            player,
            chain: DeadlineChain::new(),
            fault,
            handle: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

/// [`Alarm`] backed by a one-shot `esp_timer`.
#[derive(Clone, Copy)]
pub struct EspAlarm {
    handle: esp_timer_handle_t,
    chain: &'static DeadlineChain,
}

impl EspAlarm {
    /// Create the timer. The callback keeps a raw pointer to `ctx`.
    pub fn new<O: KeyOutput>(ctx: &'static TimerContext<O>) -> Result<Self, EspError> {
        let args = esp_timer_create_args_t {
            callback: Some(on_timer::<O>),
            arg: ctx as *const TimerContext<O> as *mut c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"morse_tick\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };

        let mut handle: esp_timer_handle_t = ptr::null_mut();
        esp!(unsafe { esp_timer_create(&args, &mut handle) })?;
        ctx.handle.store(handle, Ordering::Release);

        Ok(Self {
            handle,
            chain: &ctx.chain,
        })
    }
}

impl Alarm for EspAlarm {
    fn arm_in(&self, delay_us: u32) {
        let now = unsafe { esp_timer_get_time() };
        let delay = self.chain.start(now, delay_us);
        unsafe {
            // ESP_ERR_INVALID_STATE when not running is expected
            esp_timer_stop(self.handle);
            esp_timer_start_once(self.handle, u64::from(delay));
        }
    }

    fn cancel(&self) {
        unsafe {
            esp_timer_stop(self.handle);
        }
    }
}

unsafe extern "C" fn on_timer<O: KeyOutput>(arg: *mut c_void) {
    // SAFETY: `arg` is the 'static context registered in EspAlarm::new.
    let ctx = unsafe { &*(arg as *const TimerContext<O>) };
    let now = unsafe { esp_timer_get_time() };

    if let Reschedule::After(step_us) = ctx.player.fire(now) {
        let rearm = ctx.chain.advance(now, step_us);
        if rearm.late_us > LATE_WARN_US {
            ctx.fault.set(FaultCode::LateFiring, rearm.late_us);
            rt_warn!(RT_LOG_STREAM, now, "late by {} us", rearm.late_us);
        }
        unsafe {
            esp_timer_start_once(ctx.handle.load(Ordering::Acquire), u64::from(rearm.delay_us));
        }
    }
}
