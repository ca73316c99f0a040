use std::path::{Path, PathBuf};

use tokio::task;
use tracing::debug;

use crate::models::entries::StorageUsage;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

pub async fn storage_usage(path: &Path) -> Option<StorageUsage> {
    let path: PathBuf = path.to_path_buf();
    match task::spawn_blocking(move || filesystem_bytes(&path)).await {
        Ok(Some((total, free))) => Some(usage_from_bytes(total, free)),
        Ok(None) => None,
        Err(err) => {
            debug!(error = %err, "storage probe task failed");
            None
        }
    }
}

fn usage_from_bytes(total: u64, free: u64) -> StorageUsage {
    let used = total.saturating_sub(free);
    let percent = if total > 0 {
        ((used as f64 / total as f64) * 1000.0).round() / 10.0
    } else {
        0.0
    };
    StorageUsage {
        total: format_size(total),
        used: format_size(used),
        free: format_size(free),
        percent,
    }
}

#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
fn filesystem_bytes(path: &Path) -> Option<(u64, u64)> {
    match nix::sys::statvfs::statvfs(path) {
        Ok(stat) => {
            let fragment = stat.fragment_size() as u64;
            let total = (stat.blocks() as u64).saturating_mul(fragment);
            let free = (stat.blocks_available() as u64).saturating_mul(fragment);
            Some((total, free))
        }
        Err(err) => {
            debug!(error = %err, "statvfs failed");
            None
        }
    }
}

#[cfg(not(unix))]
fn filesystem_bytes(_path: &Path) -> Option<(u64, u64)> {
    None
}
