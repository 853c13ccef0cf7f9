//! Linux-specific shared memory operations

use crate::consts::{META_SUFFIX, SEGMENT_FILE_PREFIX, SHM_DIR};
use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

/// File mode of segment files: owner read/write only
const SEGMENT_FILE_MODE: u32 = 0o600;

/// Path of the segment file owned by `pid`
pub fn segment_path(name: &str, pid: u32) -> PathBuf {
    PathBuf::from(SHM_DIR).join(format!("{SEGMENT_FILE_PREFIX}{name}_{pid}"))
}

/// Path of the JSON metadata sidecar of a segment
pub fn meta_path(name: &str) -> PathBuf {
    PathBuf::from(SHM_DIR).join(format!("{SEGMENT_FILE_PREFIX}{name}{META_SUFFIX}"))
}

/// Split a segment file name `hal_{name}_{pid}` into name and pid.
///
/// Returns `None` for metadata sidecars and foreign files.
pub fn parse_segment_file_name(file_name: &str) -> Option<(String, u32)> {
    if file_name.ends_with(META_SUFFIX) {
        return None;
    }
    let rest = file_name.strip_prefix(SEGMENT_FILE_PREFIX)?;
    let (name, pid) = rest.rsplit_once('_')?;
    if name.is_empty() {
        return None;
    }
    let pid = pid.parse().ok()?;
    Some((name.to_string(), pid))
}

/// Create the segment file and map it read-write.
///
/// Fails with `AlreadyExists` if the file is already present.
pub fn create_segment_mmap(
    name: &str,
    path: &std::path::Path,
    size: usize,
) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .mode(SEGMENT_FILE_MODE)
        .open(path)
        .map_err(|e| map_open_error(name, e))?;

    file.set_len(size as u64)?;

    // Pre-fault pages so the first tick does not page-fault
    let mmap = unsafe { MmapOptions::new().populate().map_mut(&file)? };
    Ok(mmap)
}

/// Attach to an existing segment file
pub fn attach_segment_mmap(name: &str, path: &std::path::Path) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| map_open_error(name, e))?;

    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok(mmap)
}

fn map_open_error(name: &str, err: std::io::Error) -> ShmError {
    match err.kind() {
        ErrorKind::AlreadyExists => ShmError::AlreadyExists {
            name: name.to_string(),
        },
        ErrorKind::NotFound => ShmError::NotFound {
            name: name.to_string(),
        },
        ErrorKind::PermissionDenied => ShmError::PermissionDenied {
            name: name.to_string(),
        },
        _ => ShmError::Io { source: err },
    }
}

/// Check if process is alive using kill(pid, 0)
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    // A null signal only tests for existence
    match kill(Pid::from_raw(raw), None) {
        Ok(_) => true,
        Err(nix::Error::ESRCH) => false,
        Err(nix::Error::EPERM) => true,
        Err(_) => false,
    }
}

/// Get current process ID
pub fn get_current_pid() -> u32 {
    getpid().as_raw() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_file_names() {
        let path = segment_path("comp_hal-example", 4242);
        assert_eq!(path, PathBuf::from("/dev/shm/hal_comp_hal-example_4242"));
        assert_eq!(
            parse_segment_file_name("hal_comp_hal-example_4242"),
            Some(("comp_hal-example".to_string(), 4242))
        );
        assert_eq!(
            meta_path("comp_hal-example"),
            PathBuf::from("/dev/shm/hal_comp_hal-example.meta")
        );
    }

    #[test]
    fn test_foreign_file_names_are_ignored() {
        assert!(parse_segment_file_name("hal_comp_x.meta").is_none());
        assert!(parse_segment_file_name("other_seg_12").is_none());
        assert!(parse_segment_file_name("hal_comp_x_notapid").is_none());
        assert!(parse_segment_file_name("hal__12").is_none());
    }

    #[test]
    fn test_current_process_is_alive() {
        assert!(is_process_alive(get_current_pid()));
        assert!(!is_process_alive(u32::MAX));
    }
}
