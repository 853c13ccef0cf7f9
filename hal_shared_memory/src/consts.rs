//! Shared memory constants.
//!
//! Fundamental parameters of the segment layer. Pin table layout constants
//! live in [`crate::pin_table`].

/// Minimum segment data size in bytes (one page).
pub const SHM_MIN_SIZE: usize = 4096;

/// Maximum segment data size in bytes.
pub const SHM_MAX_SIZE: usize = 16 * 1024 * 1024;

/// CPU cache line size in bytes.
pub const CACHE_LINE_SIZE: usize = 64;

/// Magic number at the start of every segment header: "HAL_SHM\0".
pub const HAL_SHM_MAGIC: u64 = 0x48414C5F53484D00;

/// Directory holding segment and metadata files.
pub const SHM_DIR: &str = "/dev/shm";

/// File name prefix shared by every segment created by this crate.
pub const SEGMENT_FILE_PREFIX: &str = "hal_";

/// Suffix of the JSON metadata sidecar.
pub const META_SUFFIX: &str = ".meta";
