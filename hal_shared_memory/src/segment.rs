//! Shared memory segment structures and operations

use crate::consts::{CACHE_LINE_SIZE, HAL_SHM_MAGIC, SHM_MAX_SIZE, SHM_MIN_SIZE};
use crate::error::{ShmError, ShmResult};
use crate::version::VersionCounter;
use memmap2::MmapMut;
use static_assertions::const_assert_eq;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Segment header, two cache lines at the start of every mapping
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Magic number for validation
    pub magic: u64,
    /// Seqlock version of the data section
    pub version: VersionCounter,
    /// Writer process ID
    pub writer_pid: AtomicU32,
    /// Active reader count
    pub reader_count: AtomicU32,
    /// Data section size
    pub size: u64,
    /// Creation timestamp (ns since UNIX epoch)
    pub created_ts: u64,
    /// Last write timestamp (ns since UNIX epoch)
    pub last_write_ts: AtomicU64,
    _padding: [u8; 80],
}

const_assert_eq!(std::mem::size_of::<SegmentHeader>(), 128);

impl SegmentHeader {
    /// Create new segment header
    pub fn new(size: usize, writer_pid: u32) -> Self {
        let now = now_ns();

        Self {
            magic: HAL_SHM_MAGIC,
            version: VersionCounter::new(),
            writer_pid: AtomicU32::new(writer_pid),
            reader_count: AtomicU32::new(0),
            size: size as u64,
            created_ts: now,
            last_write_ts: AtomicU64::new(now),
            _padding: [0; 80],
        }
    }

    /// Validate header magic and recorded size against the mapping
    pub fn validate(&self, name: &str, mapped_len: usize) -> ShmResult<()> {
        if self.magic != HAL_SHM_MAGIC {
            return Err(ShmError::Corrupt {
                name: name.to_string(),
                reason: "bad header magic",
            });
        }
        if self.size as usize + std::mem::size_of::<Self>() > mapped_len {
            return Err(ShmError::Corrupt {
                name: name.to_string(),
                reason: "header size exceeds mapping",
            });
        }
        Ok(())
    }

    /// Increment reader count
    pub fn add_reader(&self) -> u32 {
        self.reader_count.fetch_add(1, Ordering::AcqRel)
    }

    /// Decrement reader count
    pub fn remove_reader(&self) -> u32 {
        self.reader_count.fetch_sub(1, Ordering::AcqRel)
    }

    /// Get current reader count
    pub fn get_reader_count(&self) -> u32 {
        self.reader_count.load(Ordering::Acquire)
    }

    /// Record the time of the latest write
    pub fn touch(&self) {
        self.last_write_ts.store(now_ns(), Ordering::Release);
    }
}

/// Core shared memory segment representation
pub struct SharedMemorySegment {
    /// Segment name
    pub name: String,
    /// Total mapped size (including header)
    pub total_size: usize,
    /// Data section size
    pub data_size: usize,
    mmap: MmapMut,
}

impl SharedMemorySegment {
    /// Wrap a mapping whose header has already been initialised
    pub fn new(name: String, data_size: usize, mmap: MmapMut) -> ShmResult<Self> {
        validate_segment_size(data_size)?;
        validate_memory_alignment(mmap.as_ptr() as usize)?;

        let total_size = data_size + std::mem::size_of::<SegmentHeader>();
        if mmap.len() < total_size {
            return Err(ShmError::InvalidSize { size: mmap.len() });
        }

        Ok(Self {
            name,
            total_size,
            data_size,
            mmap,
        })
    }

    /// Get header reference
    pub fn header(&self) -> &SegmentHeader {
        // Mapping is page-aligned and at least total_size long (checked in new)
        unsafe { &*(self.mmap.as_ptr() as *const SegmentHeader) }
    }

    /// Get data section pointer
    pub fn data_ptr(&self) -> *const u8 {
        unsafe { self.mmap.as_ptr().add(std::mem::size_of::<SegmentHeader>()) }
    }

    /// Get mutable data section pointer (writer only)
    pub fn data_ptr_mut(&mut self) -> *mut u8 {
        unsafe {
            self.mmap
                .as_mut_ptr()
                .add(std::mem::size_of::<SegmentHeader>())
        }
    }

    /// 32-bit atomic cell at `offset` inside the data section.
    ///
    /// Cells are shared between processes; every access must go through the
    /// returned atomic.
    pub fn cell(&self, offset: usize) -> ShmResult<&AtomicU32> {
        check_bounds(offset, 4, self.data_size)?;
        let ptr = unsafe { self.data_ptr().add(offset) };
        if (ptr as usize) % std::mem::align_of::<AtomicU32>() != 0 {
            return Err(ShmError::AlignmentError {
                address: ptr as usize,
                alignment: std::mem::align_of::<AtomicU32>(),
            });
        }
        Ok(unsafe { &*(ptr as *const AtomicU32) })
    }
}

/// Reject accesses of `len` bytes at `offset` that leave the data section
pub fn check_bounds(offset: usize, len: usize, data_size: usize) -> ShmResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= data_size => Ok(()),
        _ => Err(ShmError::InvalidSize {
            size: offset.saturating_add(len),
        }),
    }
}

/// Validate segment size constraints
pub fn validate_segment_size(size: usize) -> ShmResult<()> {
    if !(SHM_MIN_SIZE..=SHM_MAX_SIZE).contains(&size) || size % SHM_MIN_SIZE != 0 {
        return Err(ShmError::InvalidSize { size });
    }
    Ok(())
}

/// Validate memory alignment
pub fn validate_memory_alignment(address: usize) -> ShmResult<()> {
    if address % CACHE_LINE_SIZE != 0 {
        return Err(ShmError::AlignmentError {
            address,
            alignment: CACHE_LINE_SIZE,
        });
    }
    Ok(())
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
