//! Segment discovery and orphan cleanup

use crate::consts::SHM_DIR;
use crate::error::{ShmError, ShmResult};
use crate::platform::{
    attach_segment_mmap, is_process_alive, meta_path, parse_segment_file_name, segment_path,
};
use crate::segment::SegmentHeader;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::info;

/// Segment discovery service scanning the shm directory
#[derive(Debug, Default)]
pub struct SegmentDiscovery;

/// Segment metadata information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SegmentInfo {
    /// Segment name
    pub name: String,
    /// Data section size in bytes
    pub size: usize,
    /// Writer process ID
    pub writer_pid: u32,
    /// Creation timestamp
    pub created_at: SystemTime,
    /// Last access timestamp
    pub last_accessed: SystemTime,
    /// Active reader count
    pub reader_count: u32,
}

impl SegmentInfo {
    /// Whether the writing process still exists
    pub fn writer_alive(&self) -> bool {
        is_process_alive(self.writer_pid)
    }
}

impl SegmentDiscovery {
    /// Create new discovery service
    pub fn new() -> Self {
        Self
    }

    /// List all segments created by this crate, newest first
    pub fn list_segments(&self) -> ShmResult<Vec<SegmentInfo>> {
        let shm_dir = std::path::Path::new(SHM_DIR);
        if !shm_dir.exists() {
            return Ok(Vec::new());
        }

        let mut segments: Vec<SegmentInfo> = std::fs::read_dir(shm_dir)?
            .flatten()
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                let (name, pid) = parse_segment_file_name(&file_name)?;
                self.parse_segment_info(&name, pid).ok()
            })
            .collect();

        segments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(segments)
    }

    /// List segments whose name starts with `prefix`
    pub fn list_with_prefix(&self, prefix: &str) -> ShmResult<Vec<SegmentInfo>> {
        Ok(self
            .list_segments()?
            .into_iter()
            .filter(|s| s.name.starts_with(prefix))
            .collect())
    }

    /// Find a segment by name, preferring one with a live writer
    pub fn find_segment(&self, name: &str) -> ShmResult<Option<SegmentInfo>> {
        let mut matches: Vec<SegmentInfo> = self
            .list_segments()?
            .into_iter()
            .filter(|s| s.name == name)
            .collect();
        matches.sort_by_key(|s| !s.writer_alive());

        Ok(matches.into_iter().next())
    }

    /// Find a segment by name whose writer is still running
    pub fn find_live_segment(&self, name: &str) -> ShmResult<Option<SegmentInfo>> {
        Ok(self.find_segment(name)?.filter(SegmentInfo::writer_alive))
    }

    /// Remove segments whose writer process is gone
    pub fn cleanup_orphaned_segments(&self) -> ShmResult<usize> {
        let mut cleaned_count = 0;

        for segment in self.list_segments()? {
            if segment.writer_alive() {
                continue;
            }
            info!(
                "Cleaning up orphaned segment {} (writer pid {} is gone)",
                segment.name, segment.writer_pid
            );
            if std::fs::remove_file(segment_path(&segment.name, segment.writer_pid)).is_ok() {
                cleaned_count += 1;
            }
            // The sidecar may belong to a newer live writer of the same name
            if self.find_live_segment(&segment.name)?.is_none() {
                let _ = std::fs::remove_file(meta_path(&segment.name));
            }
        }

        Ok(cleaned_count)
    }

    /// Build segment information from the sidecar or, failing that, the file
    fn parse_segment_info(&self, name: &str, pid: u32) -> ShmResult<SegmentInfo> {
        if let Ok(meta_content) = std::fs::read_to_string(meta_path(name)) {
            if let Ok(mut info) = serde_json::from_str::<SegmentInfo>(&meta_content) {
                if info.writer_pid == pid {
                    if let Ok(reader_count) = self.get_current_reader_count(name, pid) {
                        info.reader_count = reader_count;
                    }
                    return Ok(info);
                }
            }
        }

        let file_meta = std::fs::metadata(segment_path(name, pid))?;
        let created_at = file_meta
            .created()
            .or_else(|_| file_meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        Ok(SegmentInfo {
            name: name.to_string(),
            size: (file_meta.len() as usize).saturating_sub(std::mem::size_of::<SegmentHeader>()),
            writer_pid: pid,
            created_at,
            last_accessed: created_at,
            reader_count: self.get_current_reader_count(name, pid).unwrap_or(0),
        })
    }

    /// Get current reader count from segment header
    fn get_current_reader_count(&self, name: &str, pid: u32) -> ShmResult<u32> {
        let mmap = attach_segment_mmap(name, &segment_path(name, pid))?;
        if mmap.len() < std::mem::size_of::<SegmentHeader>() {
            return Err(ShmError::Corrupt {
                name: name.to_string(),
                reason: "file shorter than header",
            });
        }

        let header = unsafe { &*(mmap.as_ptr() as *const SegmentHeader) };
        header.validate(name, mmap.len())?;

        Ok(header.get_reader_count())
    }
}
