//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! and defines the configuration of the example component.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hal_common::config::{ConfigError, ConfigLoader, ExampleConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ExampleConfig::load(Path::new("hal-example.toml"))?;
//!     config.validate()?;
//!     println!("Component: {}", config.example.component_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts::{
    DEFAULT_BACKEND, DEFAULT_COMPONENT_NAME, DEFAULT_TICK_MS, KNOWN_BACKENDS, MAX_TICK_MS,
};
use crate::pin::validate_name;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "hal-example"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: DEFAULT_COMPONENT_NAME.to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[example]` section: how the example component registers and runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExampleSection {
    /// Component name registered on the bus.
    #[serde(default = "default_component_name")]
    pub component_name: String,

    /// Pin prefix; defaults to the component name.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Synchronizer period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Bus backend name.
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_component_name() -> String {
    DEFAULT_COMPONENT_NAME.to_string()
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

impl Default for ExampleSection {
    fn default() -> Self {
        Self {
            component_name: default_component_name(),
            prefix: None,
            tick_ms: default_tick_ms(),
            backend: default_backend(),
        }
    }
}

impl ExampleSection {
    /// Effective pin prefix.
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.component_name)
    }
}

/// Full configuration file of the example component.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "hal-example"
///
/// [example]
/// component_name = "hal-example"
/// tick_ms = 100
/// backend = "shm"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExampleConfig {
    /// Common fields.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Example component settings.
    #[serde(default)]
    pub example: ExampleSection,
}

impl ExampleConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - `component_name` or `prefix` break the pin naming rules
    /// - `tick_ms` is 0 or above [`MAX_TICK_MS`]
    /// - `backend` is not one of [`KNOWN_BACKENDS`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let example = &self.example;
        validate_name(&example.component_name)
            .map_err(|e| ConfigError::ValidationError(format!("component_name: {e}")))?;
        validate_name(example.prefix())
            .map_err(|e| ConfigError::ValidationError(format!("prefix: {e}")))?;

        if example.tick_ms == 0 || example.tick_ms > MAX_TICK_MS {
            return Err(ConfigError::ValidationError(format!(
                "tick_ms must be in 1..={MAX_TICK_MS}, got {}",
                example.tick_ms
            )));
        }

        if !KNOWN_BACKENDS.contains(&example.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown backend '{}' (expected one of {:?})",
                example.backend, KNOWN_BACKENDS
            )));
        }

        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[test]
    fn test_defaults_reproduce_the_example() {
        let config = ExampleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.example.component_name, "hal-example");
        assert_eq!(config.example.prefix(), "hal-example");
        assert_eq!(config.example.tick_ms, 100);
        assert_eq!(config.example.backend, "shm");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[shared]
log_level = "debug"
service_name = "bench-01"

[example]
tick_ms = 250
backend = "memory"
"#
        )
        .unwrap();

        let config = ExampleConfig::load(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.example.tick_ms, 250);
        assert_eq!(config.example.backend, "memory");
        assert_eq!(config.example.component_name, "hal-example");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let result = ExampleConfig::load(Path::new("/nonexistent/hal-example.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[example\ntick_ms = ").unwrap();
        let result = ExampleConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ExampleConfig::default();
        config.example.tick_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = ExampleConfig::default();
        config.example.backend = "ethercat".to_string();
        assert!(config.validate().is_err());

        let mut config = ExampleConfig::default();
        config.example.component_name = "two words".to_string();
        assert!(config.validate().is_err());

        let mut config = ExampleConfig::default();
        config.shared.service_name.clear();
        assert!(config.validate().is_err());
    }
}
