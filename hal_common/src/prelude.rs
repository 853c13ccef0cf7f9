//! Prelude module for common re-exports.
//!
//! ```rust
//! use hal_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Pins ───────────────────────────────────────────────────────────
pub use crate::pin::{PinDirection, PinInfo, PinType, PinValue};

// ─── Bus ────────────────────────────────────────────────────────────
pub use crate::bus::{BusError, BusFactory, PinBus};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, ExampleConfig, LogLevel, SharedConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{PIN_BUTTON, PIN_COUNT, PIN_INCREMENT};

/// Default synchronizer period as Duration.
pub const DEFAULT_TICK: Duration = Duration::from_millis(crate::consts::DEFAULT_TICK_MS);
