/// Well-known locations: the home directory, the recovery holding area,
/// and the suggested scan roots.
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{DiskError, Result};

/// Home folders offered as scan roots when they exist.
const BROWSE_FOLDERS: [&str; 7] = [
    "Desktop",
    "Documents",
    "Downloads",
    "Movies",
    "Music",
    "Pictures",
    "Library",
];

/// The current user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| DiskError::Config("cannot determine the home directory".into()))
}

/// Platform trash used for recoverable deletions.
///
/// macOS keeps it at `~/.Trash`; freedesktop systems use the XDG trash
/// `files` directory.
pub fn default_recovery_dir(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join(".Trash")
    } else {
        home.join(".local").join("share").join("Trash").join("files")
    }
}

/// A suggested scan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Suggested scan roots: home, the filesystem root, then the standard home
/// folders that exist.
pub fn browse_roots(home: &Path) -> Vec<RootEntry> {
    let mut roots = vec![
        RootEntry {
            name: "Home".into(),
            path: home.to_path_buf(),
        },
        RootEntry {
            name: "Macintosh HD".into(),
            path: PathBuf::from("/"),
        },
    ];
    if !cfg!(target_os = "macos") {
        roots[1].name = "Root".into();
    }
    roots.extend(
        BROWSE_FOLDERS
            .iter()
            .map(|name| (name, home.join(name)))
            .filter(|(_, path)| path.is_dir())
            .map(|(name, path)| RootEntry {
                name: (*name).to_string(),
                path,
            }),
    );
    roots
}
