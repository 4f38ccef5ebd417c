/// Deny-list of critical paths that must never be deletion targets.
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{DiskError, Result};

/// System roots refused on every platform.
const CRITICAL_PATHS: [&str; 27] = [
    "/",
    "/Users",
    "/System",
    "/Library",
    "/Applications",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/var",
    "/tmp",
    "/private",
    "/private/etc",
    "/private/var",
    "/private/tmp",
    "/Volumes",
    "/home",
    "/root",
    "/boot",
    "/proc",
    "/sys",
    "/dev",
    "/lib",
    "/lib64",
    "/opt",
    "/srv",
    "/mnt",
];

#[derive(Debug, Clone)]
pub struct DenyList {
    paths: HashSet<PathBuf>,
}

impl DenyList {
    /// Critical system paths plus the user's home and the recovery area.
    pub fn standard(home: &Path, recovery_dir: &Path) -> Self {
        let mut list = Self::from_paths(CRITICAL_PATHS.iter().map(PathBuf::from));
        list.insert(home);
        list.insert(recovery_dir);
        list
    }

    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut list = Self {
            paths: HashSet::new(),
        };
        for path in paths {
            list.insert(&path);
        }
        list
    }

    fn insert(&mut self, path: &Path) {
        if let Ok(normalized) = normalize(path) {
            self.paths.insert(normalized);
        }
    }

    /// `true` if `path` itself (not its descendants) is denied.
    pub fn is_denied(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Validate a deletion target, returning its normalised absolute path.
    ///
    /// Both the lexical form and the form with the parent's symlinks
    /// resolved are checked, so `/tmp/../usr` and a link to a system
    /// folder's parent are caught.
    pub fn check(&self, target: &Path) -> Result<PathBuf> {
        let lexical = normalize(target)?;
        let resolved = resolve_parent(&lexical);
        for candidate in std::iter::once(&lexical).chain(resolved.as_ref()) {
            if self.is_denied(candidate) {
                warn!("Refusing to delete protected path {}", target.display());
                return Err(DiskError::ProtectedPath(lexical));
            }
        }
        Ok(lexical)
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically and any
/// trailing separator dropped.
pub fn normalize(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// `path` with its parent directory canonicalised, i.e. the entry a
/// removal would actually touch.
fn resolve_parent(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = fs::canonicalize(path.parent()?).ok()?;
    Some(parent.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> DenyList {
        DenyList::standard(Path::new("/home/u"), Path::new("/home/u/.Trash"))
    }

    #[test]
    fn critical_paths_are_refused() {
        let guard = list();
        for path in ["/", "/usr", "/etc/", "/home/u", "/home/u/.Trash", "/Users"] {
            let err = guard.check(Path::new(path)).unwrap_err();
            assert!(matches!(err, DiskError::ProtectedPath(_)), "{path} accepted");
        }
    }

    #[test]
    fn dot_segments_cannot_sneak_past() {
        let guard = list();
        assert!(guard.check(Path::new("/tmp/../usr")).is_err());
        assert!(guard.check(Path::new("/home/u/Documents/..")).is_err());
        assert!(guard.check(Path::new("/home/./u")).is_err());
    }

    #[test]
    fn descendants_are_allowed() {
        let guard = list();
        let ok = guard.check(Path::new("/home/u/Downloads/old.zip")).unwrap();
        assert_eq!(ok, PathBuf::from("/home/u/Downloads/old.zip"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_parent_is_resolved() {
        let tmp = tempfile::tempdir().unwrap();
        let link = tmp.path().join("sysroot");
        std::os::unix::fs::symlink("/", &link).unwrap();
        let guard = list();
        assert!(guard.check(&link.join("usr")).is_err());
        // The link itself is an ordinary entry.
        assert!(guard.check(&link).is_ok());
    }

    #[test]
    fn normalize_strips_trailing_separator() {
        assert_eq!(
            normalize(Path::new("/var/log/")).unwrap(),
            PathBuf::from("/var/log")
        );
    }
}
