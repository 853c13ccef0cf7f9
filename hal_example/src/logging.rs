//! Tracing setup shared by the binaries.

use hal_common::config::LogLevel;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `verbose` forces DEBUG; otherwise `default_level` applies unless
/// `RUST_LOG` says otherwise. `json` switches to JSON lines.
pub fn setup_tracing(verbose: bool, json: bool, default_level: LogLevel) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level.as_directive()))
    };

    // Logs go to stderr; stdout belongs to the display
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
