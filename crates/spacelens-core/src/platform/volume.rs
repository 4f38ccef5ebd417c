/// Volume-level usage figures for the filesystem holding a path.
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Total, used and free bytes of one volume, as the OS reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeUsage {
    pub total: u64,
    pub used: u64,
    /// Bytes available to unprivileged users.
    pub free: u64,
}

impl VolumeUsage {
    /// Used space as a percentage of total (0.0 – 100.0).
    pub fn usage_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.used as f64 / self.total as f64) * 100.0
    }
}

/// Query usage of the volume containing `path`.
#[cfg(unix)]
pub fn volume_usage(path: &Path) -> Result<VolumeUsage> {
    use nix::sys::statvfs::statvfs;

    let stats = statvfs(path).map_err(std::io::Error::from)?;
    let fragment = u64::from(stats.fragment_size());
    let total = u64::from(stats.blocks()) * fragment;
    let free_all = u64::from(stats.blocks_free()) * fragment;
    let available = u64::from(stats.blocks_available()) * fragment;

    Ok(VolumeUsage {
        total,
        used: total.saturating_sub(free_all),
        free: available,
    })
}

#[cfg(not(unix))]
pub fn volume_usage(_path: &Path) -> Result<VolumeUsage> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "volume usage is only available on Unix platforms",
    )
    .into())
}
