//! # HAL Example Component
//!
//! A small component on the HAL pin bus: it counts rising edges on the
//! `increment` input into the `count` output and mirrors a toggle button
//! onto the `button` output, reporting both in a window.
//!
//! # Module Structure
//!
//! - [`core`] - ExampleCore context object, event loop
//! - [`sync`] - Periodic synchronizer with rising-edge detection
//! - [`actions`] - User actions and the toggle button
//! - [`display`] - Display surface trait and console/recording surfaces
//! - [`backend`] - Bus backend registry (`shm`, `memory`)
//! - [`memory`] - In-process bus, probe and simulation stimulus
//! - [`logging`] - Tracing subscriber setup
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  actions  ┌─────────────────────────────┐
//! │ stdin thread ├──────────►│ ExampleCore (event loop)    │
//! └──────────────┘  (mpsc)   │  tick ──► Synchronizer      │
//!                            │  action ─► ToggleButton     │
//!                            └──────┬──────────────┬───────┘
//!                                   ▼              ▼
//!                          ┌────────────────┐ ┌───────────────┐
//!                          │ PinBus         │ │ DisplaySurface│
//!                          │ (shm / memory) │ │               │
//!                          └────────────────┘ └───────────────┘
//! ```

#![deny(missing_docs)]

pub mod actions;
pub mod backend;
pub mod core;
pub mod display;
pub mod error;
pub mod logging;
pub mod memory;
pub mod sync;

// Re-export key types for convenience
pub use crate::actions::{ToggleButton, UserAction};
pub use crate::backend::BusRegistry;
pub use crate::core::{ExampleCore, TimingStats};
pub use crate::display::{ConsoleDisplay, DisplaySurface, RecordingDisplay};
pub use crate::error::ExampleError;
pub use crate::memory::{MemoryBus, MemoryProbe, SquareWave, Stimulus};
pub use crate::sync::{SyncOutcome, Synchronizer};
