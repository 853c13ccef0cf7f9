//! Periodic synchronizer: pins in, labels out.
//!
//! Every tick the synchronizer samples `increment`, counts rising edges
//! into `count` and refreshes the display labels.

use crate::display::{DisplaySurface, count_label, state_label};
use hal_common::prelude::*;
use tracing::{debug, warn};

/// True on a 0 → 1 transition.
pub fn rising_edge(previous: bool, current: bool) -> bool {
    current && !previous
}

/// Counter value after one more edge.
///
/// Saturates at `i32::MAX`; the flag tells whether the add was clamped.
pub fn next_count(count: i32) -> (i32, bool) {
    match count.checked_add(1) {
        Some(next) => (next, false),
        None => (i32::MAX, true),
    }
}

/// Result of one synchronizer pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Sampled `increment` value
    pub input: bool,
    /// `count` after the pass
    pub count: i32,
    /// A rising edge was seen in this pass
    pub edge: bool,
}

/// Edge detector and counter driver.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    previous: bool,
    edges: u64,
    saturation_reported: bool,
}

impl Synchronizer {
    /// Synchronizer whose previous sample is `initial`.
    pub fn new(initial: bool) -> Self {
        Self {
            previous: initial,
            edges: 0,
            saturation_reported: false,
        }
    }

    /// Synchronizer seeded from the current value of `increment`.
    pub fn seeded(bus: &dyn PinBus) -> Result<Self, BusError> {
        Ok(Self::new(bus.get_bit(PIN_INCREMENT)?))
    }

    /// Previous sample of `increment`.
    pub fn previous(&self) -> bool {
        self.previous
    }

    /// Rising edges seen so far.
    pub fn edges(&self) -> u64 {
        self.edges
    }

    /// Run one pass against the bus and the display.
    pub fn update(
        &mut self,
        bus: &mut dyn PinBus,
        display: &mut dyn DisplaySurface,
    ) -> Result<SyncOutcome, BusError> {
        let input = bus.get_bit(PIN_INCREMENT)?;
        let mut count = bus.get_s32(PIN_COUNT)?;

        let edge = rising_edge(self.previous, input);
        if edge {
            let (next, saturated) = next_count(count);
            if saturated && !self.saturation_reported {
                warn!("Counter saturated at {}; further edges are not counted", i32::MAX);
                self.saturation_reported = true;
            }
            bus.set(PIN_COUNT, PinValue::S32(next))?;
            count = next;
            self.edges += 1;
            debug!("Rising edge on {}: count = {}", PIN_INCREMENT, count);
        }
        self.previous = input;

        display.set_state_label(state_label(input));
        display.set_count_label(&count_label(count));

        Ok(SyncOutcome { input, count, edge })
    }
}
