//! Lock-free reader implementation

use crate::consts::SHM_DIR;
use crate::error::{ShmError, ShmResult};
use crate::platform::{attach_segment_mmap, get_current_pid, is_process_alive, parse_segment_file_name};
use crate::segment::{SegmentHeader, SharedMemorySegment, check_bounds};
use crate::version::VersionCounter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering, fence};

/// Copies attempted before a read gives up with `VersionConflict`
const MAX_READ_RETRIES: usize = 10;

/// Lock-free reader with conflict detection
pub struct SegmentReader {
    segment: SharedMemorySegment,
    last_seen_version: u64,
    read_buffer: Vec<u8>,
    reader_pid: u32,
    writer_pid: u32,
}

impl SegmentReader {
    /// Attach to the segment with this name, preferring one whose writer is alive
    pub fn attach(name: &str) -> ShmResult<Self> {
        let (segment_path, writer_pid) = Self::find_segment_path(name)?;
        let mmap = attach_segment_mmap(name, &segment_path)?;

        if mmap.len() < std::mem::size_of::<SegmentHeader>() {
            return Err(ShmError::Corrupt {
                name: name.to_string(),
                reason: "file shorter than header",
            });
        }
        let header = unsafe { &*(mmap.as_ptr() as *const SegmentHeader) };
        header.validate(name, mmap.len())?;
        let data_size = header.size as usize;

        let segment = SharedMemorySegment::new(name.to_string(), data_size, mmap)?;
        segment.header().add_reader();

        let initial_version = segment.header().version.load();

        Ok(Self {
            segment,
            last_seen_version: initial_version,
            read_buffer: Vec::with_capacity(data_size),
            reader_pid: get_current_pid(),
            writer_pid,
        })
    }

    /// Read the whole data section with conflict detection
    pub fn read(&mut self) -> ShmResult<&[u8]> {
        self.read_range(0, self.segment.data_size)
    }

    /// Read data range with offset and length
    pub fn read_range(&mut self, offset: usize, len: usize) -> ShmResult<&[u8]> {
        check_bounds(offset, len, self.segment.data_size)?;

        if self.read_buffer.len() < len {
            self.read_buffer.resize(len, 0);
        }

        let header = self.segment.header();

        for _attempt in 0..MAX_READ_RETRIES {
            let version_before = header.version.load();

            if !VersionCounter::is_stable(version_before) {
                std::thread::yield_now();
                continue;
            }

            fence(Ordering::Acquire);

            unsafe {
                let src_ptr = self.segment.data_ptr().add(offset);
                std::ptr::copy_nonoverlapping(src_ptr, self.read_buffer.as_mut_ptr(), len);
            }

            fence(Ordering::Acquire);

            let version_after = header.version.load();
            if version_before == version_after {
                self.last_seen_version = version_after;
                return Ok(&self.read_buffer[..len]);
            }

            std::thread::yield_now();
        }

        Err(ShmError::VersionConflict)
    }

    /// Atomic 32-bit cell in the data section
    pub fn cell(&self, offset: usize) -> ShmResult<&AtomicU32> {
        self.segment.cell(offset)
    }

    /// Version of the last consistent read
    pub fn version(&self) -> u64 {
        self.last_seen_version
    }

    /// Check if data has changed since last read
    pub fn has_changed(&self) -> bool {
        let current_version = self.segment.header().version.load();
        current_version != self.last_seen_version && VersionCounter::is_stable(current_version)
    }

    /// Get reader process ID
    pub fn reader_pid(&self) -> u32 {
        self.reader_pid
    }

    /// Process ID encoded in the segment file name
    pub fn writer_pid(&self) -> u32 {
        self.writer_pid
    }

    /// Whether the writing process still exists
    pub fn writer_alive(&self) -> bool {
        is_process_alive(self.writer_pid)
    }

    /// Get segment name
    pub fn name(&self) -> &str {
        &self.segment.name
    }

    /// Get data size
    pub fn data_size(&self) -> usize {
        self.segment.data_size
    }

    /// Get current reader count
    pub fn reader_count(&self) -> u32 {
        self.segment.header().get_reader_count()
    }

    /// Find the segment file for a name: live writers first, then newest pid
    fn find_segment_path(name: &str) -> ShmResult<(PathBuf, u32)> {
        let shm_dir = std::path::Path::new(SHM_DIR);
        let entries = std::fs::read_dir(shm_dir).map_err(|_| ShmError::NotFound {
            name: name.to_string(),
        })?;

        let mut candidates: Vec<(bool, u32, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                let (segment_name, pid) = parse_segment_file_name(&file_name)?;
                (segment_name == name).then(|| (is_process_alive(pid), pid, entry.path()))
            })
            .collect();

        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        candidates
            .into_iter()
            .next()
            .map(|(_, pid, path)| (path, pid))
            .ok_or_else(|| ShmError::NotFound {
                name: name.to_string(),
            })
    }
}

impl Drop for SegmentReader {
    fn drop(&mut self) {
        self.segment.header().remove_reader();
    }
}
