//! Error types for shared memory operations

use hal::bus::BusError;
use thiserror::Error;

/// Errors that can occur during shared memory operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment already exists
    #[error("Segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// Segment not found
    #[error("Segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// Invalid segment size or out-of-bounds access
    #[error("Invalid segment size: {size} bytes")]
    InvalidSize {
        /// Attempted size in bytes
        size: usize,
    },

    /// Version conflict detected during read
    #[error("Version conflict detected - retry recommended")]
    VersionConflict,

    /// Permission denied
    #[error("Permission denied accessing segment: {name}")]
    PermissionDenied {
        /// Segment name
        name: String,
    },

    /// Memory alignment error
    #[error("Memory alignment error: address {address:#x} not aligned to {alignment}")]
    AlignmentError {
        /// Memory address
        address: usize,
        /// Required alignment
        alignment: usize,
    },

    /// Segment or pin table content is not what this crate writes
    #[error("Corrupt segment {name}: {reason}")]
    Corrupt {
        /// Segment name
        name: String,
        /// What failed to validate
        reason: &'static str,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        /// Source JSON error
        #[from]
        source: serde_json::Error,
    },
}

impl From<ShmError> for BusError {
    fn from(err: ShmError) -> Self {
        BusError::Shm(err.to_string())
    }
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_bus_error() {
        let err: BusError = ShmError::NotFound {
            name: "comp_missing".to_string(),
        }
        .into();
        assert_eq!(err, BusError::Shm("Segment not found: comp_missing".to_string()));
    }
}
