use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::core::error::{BootstrapError, BootstrapResult};

/// Fail when the disk holding `path` has less than `minimum_bytes` available.
/// Paths whose mount point cannot be resolved pass.
pub fn ensure_min_disk_space(path: &Path, minimum_bytes: u64) -> BootstrapResult<()> {
    if minimum_bytes == 0 {
        return Ok(());
    }
    match available_space_at(path) {
        Some(available) if available < minimum_bytes => Err(BootstrapError::Download(format!(
            "not enough free space at {}: {} available, {} required",
            path.display(),
            format_bytes(available),
            format_bytes(minimum_bytes)
        ))),
        Some(available) => {
            debug!("{} free at {:?}", format_bytes(available), path);
            Ok(())
        }
        None => {
            debug!("No mount point found for {:?}, skipping space check", path);
            Ok(())
        }
    }
}

/// Available bytes on the most specific mount containing `path`.
pub fn available_space_at(path: &Path) -> Option<u64> {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    sysinfo::Disks::new_with_refreshed_list()
        .list()
        .iter()
        .filter(|disk| canonical.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

/// Total size in bytes of the regular files below `root`.
pub fn dir_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
