//! HAL Common Library
//!
//! Shared definitions for every crate in the hal-example workspace.
//!
//! # Module Structure
//!
//! - [`pin`] - Pin types, directions, values and naming rules
//! - [`bus`] - The `PinBus` trait implemented by every registry backend
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Limits and defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use hal_common::prelude::*;
//!
//! let value = PinValue::parse(PinType::Bit, "TRUE").unwrap();
//! assert_eq!(value, PinValue::Bit(true));
//! ```

pub mod bus;
pub mod config;
pub mod consts;
pub mod pin;
pub mod prelude;
