//! Error type of the example component.

use hal_common::bus::BusError;
use hal_common::config::ConfigError;
use thiserror::Error;

/// Errors raised while starting or running the example component.
#[derive(Debug, Error)]
pub enum ExampleError {
    /// Pin registry failure
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Display surface could not be written
    #[error("Display error: {0}")]
    Display(#[from] std::io::Error),

    /// Input line that is not a known user action
    #[error("Unknown action '{0}' (expected t, on, off or q)")]
    UnknownAction(String),

    /// `tick()` or `run()` called before `init()`
    #[error("Component not initialized")]
    NotInitialized,
}
