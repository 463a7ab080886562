//! MorseBlinker - Main entry point
//!
//! On ESP-IDF: UART console in, LED and key line out, `esp_timer` drives
//! the tick player.
//!
//! Elsewhere: a host simulator. Stdin is the console, LED transitions are
//! printed to stdout and a thread stands in for the hardware timer.

use morse_blinker::log_globals::{FG_LOG_STREAM, RT_LOG_STREAM};
use morse_blinker::Scheduler;

/// Shared playback context, alive for the whole program.
static SCHEDULER: Scheduler = Scheduler::new();

#[cfg(target_os = "espidf")]
fn main() -> Result<(), esp_idf_svc::sys::EspError> {
    use core::fmt::Write;

    use esp_idf_svc::hal::delay::FreeRtos;
    use morse_blinker::config::HardwareConfig;
    use morse_blinker::hal::{self, Board, EspAlarm, KeyLines, TimerContext};
    use morse_blinker::uart_logger::LogDrain;
    use morse_blinker::{rt_info, rt_warn, CommandInterpreter, TickPlayer, VERSION};

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    // The timer callback reaches the board and its context through 'static
    // references: leak both
    let config = HardwareConfig::default();
    let board: &'static Board = Box::leak(Box::new(Board::take(&config)?));
    let lines: &'static KeyLines = &board.lines;
    let mut input = board.console.input();
    let mut console = board.console.writer();

    let player = TickPlayer::new(&SCHEDULER, lines, &RT_LOG_STREAM);
    let ctx: &'static TimerContext<&'static KeyLines> =
        Box::leak(Box::new(TimerContext::new(player, SCHEDULER.fault())));
    let alarm = EspAlarm::new(ctx)?;

    let mut interp = CommandInterpreter::new(&SCHEDULER, lines, alarm, &FG_LOG_STREAM);
    let mut drain = LogDrain::new();

    let _ = writeln!(console, "{}", VERSION);
    rt_info!(
        FG_LOG_STREAM,
        hal::now_us(),
        "{} WPM, LED GPIO{}, key GPIO{:?}, console GPIO{}/{} @ {}",
        SCHEDULER.speed().wpm(),
        config.led_pin,
        config.key_pin,
        config.console_tx_pin,
        config.console_rx_pin,
        config.console_baud
    );

    loop {
        let now = hal::now_us();
        interp.poll(&mut input, now);
        if let Some(report) = SCHEDULER.fault().take() {
            rt_warn!(FG_LOG_STREAM, now, "{}", report);
        }
        drain.drain_into(&[&RT_LOG_STREAM, &FG_LOG_STREAM], now, &mut console);
        FreeRtos::delay_ms(10);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use std::thread;
    use std::time::Duration;

    use morse_blinker::logging::LogLevel;
    use morse_blinker::uart_logger::LogDrain;
    use morse_blinker::{rt_info, rt_warn, CommandInterpreter, TickPlayer, VERSION};

    use sim::{Clock, ConsoleLed, StdinInput, StdoutWriter, ThreadAlarm};

    let verbose = std::env::args().any(|arg| arg == "-v" || arg == "--verbose");

    let clock = Clock::start();
    let led = ConsoleLed::new(&clock);
    let alarm = ThreadAlarm::new(&clock, SCHEDULER.fault());
    let player = TickPlayer::new(&SCHEDULER, &led, &RT_LOG_STREAM);
    let mut input = StdinInput::spawn();

    println!("{} (host simulator)", VERSION);
    println!("type text, then Enter. \\S<wpm> speed, \\- \\. \\<space> raw, \\1 \\0 manual, ^U cancel");

    thread::scope(|s| {
        s.spawn(|| alarm.run(&player));

        let mut interp = CommandInterpreter::new(&SCHEDULER, &led, &alarm, &FG_LOG_STREAM);
        let mut drain = LogDrain::with_max_level(if verbose {
            LogLevel::Trace
        } else {
            LogLevel::Info
        });
        let mut out = StdoutWriter;

        rt_info!(FG_LOG_STREAM, clock.now_us(), "{} WPM", SCHEDULER.speed().wpm());

        loop {
            let now = clock.now_us();
            interp.poll(&mut input, now);
            if let Some(report) = SCHEDULER.fault().take() {
                rt_warn!(FG_LOG_STREAM, now, "{}", report);
            }
            drain.drain_into(&[&RT_LOG_STREAM, &FG_LOG_STREAM], now, &mut out);

            // Stdin closed: play out what is queued, then exit
            if input.is_closed() && SCHEDULER.is_drained() && !SCHEDULER.is_running() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        alarm.shutdown();
        drain.drain_into(&[&RT_LOG_STREAM, &FG_LOG_STREAM], clock.now_us(), &mut out);
    });
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::io::{Read, Write as _};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Receiver, TryRecvError};
    use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
    use std::thread;
    use std::time::{Duration, Instant};

    use morse_blinker::deadline::DeadlineChain;
    use morse_blinker::fault::{FaultCode, FaultState};
    use morse_blinker::log_globals::RT_LOG_STREAM;
    use morse_blinker::{rt_warn, Alarm, InputSource, KeyOutput, Reschedule, TickPlayer};

    /// Lateness worth a log line and a fault count.
    const LATE_WARN_US: u32 = 2_000;

    /// Microseconds since the simulator started.
    pub struct Clock(Instant);

    impl Clock {
        pub fn start() -> Self {
            Self(Instant::now())
        }

        pub fn now_us(&self) -> i64 {
            self.0.elapsed().as_micros() as i64
        }
    }

    /// Prints level changes with a timestamp.
    pub struct ConsoleLed<'a> {
        clock: &'a Clock,
        lit: AtomicBool,
    }

    impl<'a> ConsoleLed<'a> {
        pub fn new(clock: &'a Clock) -> Self {
            Self {
                clock,
                lit: AtomicBool::new(false),
            }
        }
    }

    impl KeyOutput for ConsoleLed<'_> {
        fn set(&self, on: bool) {
            if self.lit.swap(on, Ordering::Relaxed) != on {
                println!(
                    "[{:10}] LED {}",
                    self.clock.now_us(),
                    if on { "ON" } else { "off" }
                );
            }
        }
    }

    /// Stand-in for a one-shot hardware timer: a single pending deadline
    /// served by [`ThreadAlarm::run`].
    pub struct ThreadAlarm<'a> {
        clock: &'a Clock,
        fault: &'a FaultState,
        chain: DeadlineChain,
        pending: Mutex<Option<Instant>>,
        wake: Condvar,
        shutdown: AtomicBool,
    }

    impl<'a> ThreadAlarm<'a> {
        pub fn new(clock: &'a Clock, fault: &'a FaultState) -> Self {
            Self {
                clock,
                fault,
                chain: DeadlineChain::new(),
                pending: Mutex::new(None),
                wake: Condvar::new(),
                shutdown: AtomicBool::new(false),
            }
        }

        fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
            self.pending.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Stop [`run`](Self::run) at its next wakeup.
        pub fn shutdown(&self) {
            self.shutdown.store(true, Ordering::Release);
            let _guard = self.lock();
            self.wake.notify_all();
        }

        /// Timer thread body: wait for the deadline, fire, re-arm.
        pub fn run<O: KeyOutput>(&self, player: &TickPlayer<'_, O>) {
            while self.wait_due() {
                let now = self.clock.now_us();
                if let Reschedule::After(step_us) = player.fire(now) {
                    let rearm = self.chain.advance(now, step_us);
                    if rearm.late_us > LATE_WARN_US {
                        self.fault.set(FaultCode::LateFiring, rearm.late_us);
                        rt_warn!(RT_LOG_STREAM, now, "late by {} us", rearm.late_us);
                    }
                    let mut pending = self.lock();
                    // A foreground arm_in() in the meantime wins
                    if pending.is_none() {
                        *pending = Some(Instant::now() + Duration::from_micros(u64::from(rearm.delay_us)));
                    }
                }
            }
        }

        /// Block until the pending deadline passes. `false` on shutdown.
        fn wait_due(&self) -> bool {
            let mut pending = self.lock();
            loop {
                if self.shutdown.load(Ordering::Acquire) {
                    return false;
                }
                match *pending {
                    Some(at) => {
                        let now = Instant::now();
                        if at <= now {
                            *pending = None;
                            return true;
                        }
                        pending = self
                            .wake
                            .wait_timeout(pending, at - now)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0;
                    }
                    None => {
                        pending = self.wake.wait(pending).unwrap_or_else(PoisonError::into_inner);
                    }
                }
            }
        }
    }

    impl Alarm for ThreadAlarm<'_> {
        fn arm_in(&self, delay_us: u32) {
            let delay = self.chain.start(self.clock.now_us(), delay_us);
            *self.lock() = Some(Instant::now() + Duration::from_micros(u64::from(delay)));
            self.wake.notify_all();
        }

        fn cancel(&self) {
            *self.lock() = None;
            self.wake.notify_all();
        }
    }

    /// Stdin bytes, read by a helper thread.
    pub struct StdinInput {
        rx: Receiver<u8>,
        closed: bool,
    }

    impl StdinInput {
        pub fn spawn() -> Self {
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                for byte in std::io::stdin().lock().bytes() {
                    match byte {
                        Ok(b) if tx.send(b).is_ok() => {}
                        _ => break,
                    }
                }
            });
            Self { rx, closed: false }
        }

        /// True once stdin reached EOF and every byte was consumed.
        pub fn is_closed(&self) -> bool {
            self.closed
        }
    }

    impl InputSource for StdinInput {
        fn poll(&mut self) -> Option<u8> {
            match self.rx.try_recv() {
                Ok(byte) => Some(byte),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    None
                }
            }
        }
    }

    /// Log sink on stdout.
    pub struct StdoutWriter;

    impl core::fmt::Write for StdoutWriter {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            std::io::stdout()
                .write_all(s.as_bytes())
                .map_err(|_| core::fmt::Error)
        }
    }
}
