/// Sizes of well-known reclaimable locations (caches, logs, trash,
/// downloads).
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::probe::SizeProbe;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanTarget {
    pub id: &'static str,
    pub name: &'static str,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub exists: bool,
}

/// `(id, name, path)` of every cleanup target for this platform.
pub fn target_locations(home: &Path, recovery_dir: &Path) -> Vec<(&'static str, &'static str, PathBuf)> {
    let (caches, logs) = if cfg!(target_os = "macos") {
        (home.join("Library/Caches"), home.join("Library/Logs"))
    } else {
        (home.join(".cache"), home.join(".local/state"))
    };
    vec![
        ("user_caches", "User Caches", caches),
        ("user_logs", "User Logs", logs),
        ("trash", "Trash", recovery_dir.to_path_buf()),
        ("downloads", "Downloads", home.join("Downloads")),
    ]
}

/// Measure each cleanup target. Missing locations report zero.
pub fn clean_targets(probe: &SizeProbe, home: &Path, recovery_dir: &Path) -> Vec<CleanTarget> {
    target_locations(home, recovery_dir)
        .into_iter()
        .map(|(id, name, path)| {
            let exists = path.exists();
            let size_bytes = if exists { probe.measure(&path) } else { 0 };
            CleanTarget {
                id,
                name,
                path,
                size_bytes,
                exists,
            }
        })
        .collect()
}
