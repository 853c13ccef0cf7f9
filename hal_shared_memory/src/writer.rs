//! Single writer implementation with exclusive ownership

use crate::discovery::SegmentInfo;
use crate::error::ShmResult;
use crate::platform::{create_segment_mmap, get_current_pid, meta_path, segment_path};
use crate::segment::{SegmentHeader, SharedMemorySegment, check_bounds, validate_segment_size};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::atomic::{AtomicU32, Ordering, fence};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Single writer with exclusive segment ownership
pub struct SegmentWriter {
    segment: SharedMemorySegment,
    current_version: u64,
    writer_pid: u32,
}

impl SegmentWriter {
    /// Create new writer with exclusive segment ownership
    pub fn create(name: &str, size: usize) -> ShmResult<Self> {
        validate_segment_size(size)?;

        let writer_pid = get_current_pid();
        let path = segment_path(name, writer_pid);

        let header_size = std::mem::size_of::<SegmentHeader>();
        let mut mmap = create_segment_mmap(name, &path, size + header_size)?;

        // Fresh file is zero-filled; write the header before anyone can validate it
        unsafe {
            std::ptr::write(
                mmap.as_mut_ptr() as *mut SegmentHeader,
                SegmentHeader::new(size, writer_pid),
            );
        }
        fence(Ordering::Release);

        let segment = match SharedMemorySegment::new(name.to_string(), size, mmap) {
            Ok(segment) => segment,
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                return Err(e);
            }
        };

        let writer = Self {
            segment,
            current_version: 0,
            writer_pid,
        };

        // Drop removes the segment file if the sidecar cannot be written
        writer.create_metadata_file()?;

        debug!("Created segment {} ({} bytes) at {:?}", name, size, path);
        Ok(writer)
    }

    /// Write data at the start of the data section
    pub fn write(&mut self, data: &[u8]) -> ShmResult<()> {
        self.write_at(0, data)
    }

    /// Write data at specific offset under the seqlock
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> ShmResult<()> {
        check_bounds(offset, data.len(), self.segment.data_size)?;

        let data_ptr = unsafe { self.segment.data_ptr_mut().add(offset) };
        let header = self.segment.header();

        header.version.begin_write();
        fence(Ordering::Release);

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), data_ptr, data.len());
        }

        fence(Ordering::Release);
        self.current_version = header.version.end_write();
        header.touch();

        Ok(())
    }

    /// Borrow `len` bytes of the data section.
    ///
    /// The writer is the only process mutating non-cell bytes, so no
    /// version check is needed here.
    pub fn read_at(&self, offset: usize, len: usize) -> ShmResult<&[u8]> {
        check_bounds(offset, len, self.segment.data_size)?;
        Ok(unsafe { std::slice::from_raw_parts(self.segment.data_ptr().add(offset), len) })
    }

    /// Atomic 32-bit cell in the data section
    pub fn cell(&self, offset: usize) -> ShmResult<&AtomicU32> {
        self.segment.cell(offset)
    }

    /// Get current version
    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    /// Get writer process ID
    pub fn writer_pid(&self) -> u32 {
        self.writer_pid
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

    /// Create JSON metadata file for discovery
    fn create_metadata_file(&self) -> ShmResult<()> {
        let now = SystemTime::now();
        let metadata = SegmentInfo {
            name: self.segment.name.clone(),
            size: self.segment.data_size,
            writer_pid: self.writer_pid,
            created_at: now,
            last_accessed: now,
            reader_count: 0,
        };

        let metadata_json = serde_json::to_string_pretty(&metadata)?;

        // A stale sidecar left by a dead writer is replaced
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .mode(0o600)
            .open(meta_path(&self.segment.name))?;

        file.write_all(metadata_json.as_bytes())?;
        Ok(())
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        let name = &self.segment.name;
        if let Err(e) = std::fs::remove_file(segment_path(name, self.writer_pid)) {
            warn!("Failed to remove segment {}: {}", name, e);
        }
        let _ = std::fs::remove_file(meta_path(name));
        debug!("Removed segment {}", name);
    }
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("name", &self.segment.name)
            .field("data_size", &self.segment.data_size)
            .field("writer_pid", &self.writer_pid)
            .field("current_version", &self.current_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SHM_MIN_SIZE;
    use crate::error::ShmError;

    fn unique(name: &str) -> String {
        format!("{}_{}", name, std::process::id())
    }

    #[test]
    fn test_writer_creation() {
        let writer = SegmentWriter::create(&unique("w_create"), SHM_MIN_SIZE).unwrap();
        assert_eq!(writer.data_size(), SHM_MIN_SIZE);
        assert_eq!(writer.current_version(), 0);
        assert!(writer.writer_pid() > 0);
    }

    #[test]
    fn test_exclusive_creation() {
        let name = unique("w_exclusive");
        let _writer1 = SegmentWriter::create(&name, SHM_MIN_SIZE).unwrap();

        let writer2 = SegmentWriter::create(&name, SHM_MIN_SIZE);
        assert!(matches!(writer2, Err(ShmError::AlreadyExists { .. })));
    }

    #[test]
    fn test_write_and_read_back() {
        let mut writer = SegmentWriter::create(&unique("w_rw"), SHM_MIN_SIZE).unwrap();

        writer.write_at(100, b"pins").unwrap();
        assert_eq!(writer.read_at(100, 4).unwrap(), b"pins");

        let large_data = vec![0u8; SHM_MIN_SIZE + 1];
        assert!(matches!(
            writer.write(&large_data),
            Err(ShmError::InvalidSize { .. })
        ));
        assert!(writer.read_at(SHM_MIN_SIZE - 2, 4).is_err());
    }

    #[test]
    fn test_version_is_even_after_each_write() {
        let mut writer = SegmentWriter::create(&unique("w_version"), SHM_MIN_SIZE).unwrap();

        writer.write(b"a").unwrap();
        assert_eq!(writer.current_version(), 2);
        writer.write(b"b").unwrap();
        assert_eq!(writer.current_version(), 4);
    }

    #[test]
    fn test_drop_removes_files() {
        let name = unique("w_drop");
        let writer = SegmentWriter::create(&name, SHM_MIN_SIZE).unwrap();
        let pid = writer.writer_pid();
        assert!(segment_path(&name, pid).exists());
        assert!(meta_path(&name).exists());

        drop(writer);
        assert!(!segment_path(&name, pid).exists());
        assert!(!meta_path(&name).exists());
    }
}
