//! Seqlock version counter embedded in every segment header

use std::sync::atomic::{AtomicU64, Ordering};

/// Even/odd version counter.
///
/// The single writer bumps it to an odd value before touching the data
/// section and to the next even value afterwards. Readers sample it before
/// and after copying; a copy is consistent only if both samples are equal
/// and even.
#[derive(Debug)]
#[repr(transparent)]
pub struct VersionCounter {
    counter: AtomicU64,
}

impl VersionCounter {
    /// New counter at 0 (stable)
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Current version with acquire ordering
    pub fn load(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Enter the write section; returns the odd version
    pub fn begin_write(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Leave the write section; returns the even version
    pub fn end_write(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Even: no write in progress
    pub const fn is_stable(version: u64) -> bool {
        version % 2 == 0
    }
}

impl Default for VersionCounter {
    fn default() -> Self {
        Self::new()
    }
}
