//! Example core: component context and event loop.
//!
//! `ExampleCore` owns the bus handle, the display, the synchronizer and the
//! button state. The event loop runs on one thread: it fires the periodic
//! synchronizer and handles user actions delivered over a channel.

use crate::actions::{ToggleButton, UserAction};
use crate::display::DisplaySurface;
use crate::error::ExampleError;
use crate::memory::Stimulus;
use crate::sync::{SyncOutcome, Synchronizer};
use hal_common::prelude::*;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest wait between two checks of the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The example component and its window.
pub struct ExampleCore<D: DisplaySurface> {
    /// Pin registry handle
    bus: Box<dyn PinBus>,
    /// Window surface
    display: D,
    /// Edge detector, created by `init()`
    sync: Option<Synchronizer>,
    /// Toggle button state
    button: ToggleButton,
    /// Optional input generator (simulation)
    stimulus: Option<Box<dyn Stimulus>>,
    /// Synchronizer period
    tick_period: Duration,
    /// Running flag for event loop control
    running: Arc<AtomicBool>,
    /// Timing statistics
    stats: TimingStats,
}

/// Timing statistics of the periodic synchronizer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingStats {
    /// Number of ticks executed
    pub tick_count: u64,
    /// Ticks whose callback took longer than the period
    pub overruns: u64,
    /// Longest callback
    pub max_tick_us: u64,
    /// Sum of callback durations for average calculation
    pub total_tick_us: u64,
}

impl TimingStats {
    /// Account one tick that took `elapsed`.
    ///
    /// Returns true when the tick overran `period`.
    pub fn record(&mut self, elapsed: Duration, period: Duration) -> bool {
        let tick_us = elapsed.as_micros() as u64;
        self.tick_count += 1;
        self.total_tick_us += tick_us;
        self.max_tick_us = self.max_tick_us.max(tick_us);

        let overrun = elapsed > period;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    /// Average callback duration.
    pub fn avg_tick_us(&self) -> u64 {
        self.total_tick_us.checked_div(self.tick_count).unwrap_or(0)
    }

    fn should_report_overrun(&self) -> bool {
        self.overruns <= 10 || self.overruns % 1000 == 0
    }
}

impl<D: DisplaySurface> ExampleCore<D> {
    /// Wrap a freshly registered component.
    pub fn new(bus: Box<dyn PinBus>, display: D, tick_period: Duration) -> Self {
        Self {
            bus,
            display,
            sync: None,
            button: ToggleButton::default(),
            stimulus: None,
            tick_period,
            running: Arc::new(AtomicBool::new(true)),
            stats: TimingStats::default(),
        }
    }

    /// Apply `stimulus` before every synchronizer pass.
    pub fn with_stimulus(mut self, stimulus: Box<dyn Stimulus>) -> Self {
        self.stimulus = Some(stimulus);
        self
    }

    /// Create the pins, publish the component and run the first update.
    ///
    /// # Errors
    /// Fails if the prefix or a pin cannot be created, or if the component
    /// is already ready.
    pub fn init(&mut self, prefix: &str) -> Result<(), ExampleError> {
        info!(
            "Initializing component '{}' on the {} bus (prefix '{}')",
            self.bus.component_name(),
            self.bus.backend(),
            prefix
        );

        if self.bus.prefix() != prefix {
            self.bus.set_prefix(prefix)?;
        }

        // A positive edge on `increment` increases `count`
        self.bus.new_pin(PIN_INCREMENT, PinType::Bit, PinDirection::In)?;
        let sync = Synchronizer::seeded(&*self.bus)?;

        self.bus.new_pin(PIN_COUNT, PinType::S32, PinDirection::Out)?;

        self.bus.new_pin(PIN_BUTTON, PinType::Bit, PinDirection::Out)?;
        self.bus.set(PIN_BUTTON, PinValue::Bit(self.button.is_active()))?;

        self.bus.ready()?;
        self.sync = Some(sync);

        self.update()?;
        info!("Component '{}' initialized", self.bus.component_name());
        Ok(())
    }

    /// Synchronize pins and display once.
    fn update(&mut self) -> Result<SyncOutcome, ExampleError> {
        let sync = self.sync.as_mut().ok_or(ExampleError::NotInitialized)?;
        let outcome = sync.update(&mut *self.bus, &mut self.display)?;
        self.display.set_button(self.button.is_active());
        self.display.present()?;
        Ok(outcome)
    }

    /// Timer callback: apply the stimulus, then synchronize.
    pub fn tick(&mut self) -> Result<SyncOutcome, ExampleError> {
        if self.sync.is_none() {
            return Err(ExampleError::NotInitialized);
        }
        if let Some(stimulus) = self.stimulus.as_mut() {
            stimulus.step()?;
        }
        self.update()
    }

    /// Handle one user action.
    ///
    /// Returns `ControlFlow::Break` when the window is closed.
    pub fn handle_action(&mut self, action: UserAction) -> Result<ControlFlow<()>, ExampleError> {
        if action == UserAction::Quit {
            info!("Window closed");
            return Ok(ControlFlow::Break(()));
        }
        if self.sync.is_none() {
            return Err(ExampleError::NotInitialized);
        }

        let active = self.button.apply(action);
        self.bus.set(PIN_BUTTON, PinValue::Bit(active))?;
        self.display.set_button(active);
        self.display.present()?;
        debug!("Button {}", if active { "pressed" } else { "released" });
        Ok(ControlFlow::Continue(()))
    }

    /// Run the event loop until the window is closed or the running flag drops.
    ///
    /// The flag starts set; a shutdown requested before `run()` makes it return at once.
    ///
    /// The next tick is scheduled from the end of the previous one.
    ///
    /// # Errors
    /// Stops at the first failing pin access or display write.
    pub fn run(&mut self, actions: &Receiver<UserAction>) -> Result<(), ExampleError> {
        if self.sync.is_none() {
            return Err(ExampleError::NotInitialized);
        }

        info!(
            "Starting event loop (tick={}ms)...",
            self.tick_period.as_millis()
        );
        let mut next_tick = Instant::now() + self.tick_period;

        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= next_tick {
                self.tick()?;
                let elapsed = now.elapsed();
                if self.stats.record(elapsed, self.tick_period)
                    && self.stats.should_report_overrun()
                {
                    warn!(
                        "Tick overrun #{}: callback took {}us (period {}ms)",
                        self.stats.overruns,
                        elapsed.as_micros(),
                        self.tick_period.as_millis()
                    );
                }
                next_tick = Instant::now() + self.tick_period;
                continue;
            }

            let wait = (next_tick - now).min(POLL_INTERVAL);
            match actions.recv_timeout(wait) {
                Ok(action) => {
                    if self.handle_action(action)?.is_break() {
                        self.running.store(false, Ordering::SeqCst);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Input closed");
                    self.running.store(false, Ordering::SeqCst);
                }
            }
        }

        info!(
            "Event loop stopped after {} ticks (overruns: {}, avg={}us, max={}us)",
            self.stats.tick_count,
            self.stats.overruns,
            self.stats.avg_tick_us(),
            self.stats.max_tick_us
        );
        Ok(())
    }

    /// Stop the event loop. The component is released when the core is dropped.
    pub fn shutdown(&mut self) {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Timing statistics.
    pub fn stats(&self) -> TimingStats {
        self.stats
    }

    /// Pin registry handle.
    pub fn bus(&self) -> &dyn PinBus {
        &*self.bus
    }

    /// Window surface.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Toggle button state.
    pub fn button(&self) -> bool {
        self.button.is_active()
    }
}
