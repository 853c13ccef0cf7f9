//! Platform-specific segment mapping and process helpers.

pub mod linux;

pub use linux::*;
