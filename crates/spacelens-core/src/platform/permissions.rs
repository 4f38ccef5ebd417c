/// Privilege and access checks.
///
/// Some folders (mail, messages, browser data) are hidden by the OS unless
/// the process has been granted full disk access. Listing one of them is
/// the cheapest reliable probe.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

/// Result of [`check_permissions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionReport {
    /// The protected folder could be listed, or does not exist.
    pub full_disk_access: bool,
    pub is_superuser: bool,
    pub probed_path: PathBuf,
}

/// Folder whose listing requires full disk access.
pub fn protected_probe_path(home: &Path) -> PathBuf {
    home.join("Library").join("Messages")
}

/// Check whether the current process runs as the superuser.
#[cfg(unix)]
pub fn is_superuser() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_superuser() -> bool {
    false
}

/// Probe whether `path` can be listed. A missing folder counts as granted.
pub fn can_list(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(_) => true,
        Err(err) if err.kind() == ErrorKind::NotFound => true,
        Err(err) => {
            debug!("Access probe for {} failed: {err}", path.display());
            false
        }
    }
}

pub fn check_permissions(home: &Path) -> PermissionReport {
    let probed_path = protected_probe_path(home);
    PermissionReport {
        full_disk_access: can_list(&probed_path),
        is_superuser: is_superuser(),
        probed_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_protected_folder_counts_as_granted() {
        let home = tempfile::tempdir().unwrap();
        let report = check_permissions(home.path());
        assert!(report.full_disk_access);
        assert!(report.probed_path.ends_with("Library/Messages"));
    }

    #[test]
    fn listable_folder_is_granted() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(protected_probe_path(home.path())).unwrap();
        assert!(check_permissions(home.path()).full_disk_access);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_folder_is_denied() {
        use std::os::unix::fs::PermissionsExt;

        if is_superuser() {
            return;
        }
        let home = tempfile::tempdir().unwrap();
        let probe = protected_probe_path(home.path());
        std::fs::create_dir_all(&probe).unwrap();
        std::fs::set_permissions(&probe, std::fs::Permissions::from_mode(0o000)).unwrap();
        let granted = check_permissions(home.path()).full_disk_access;
        std::fs::set_permissions(&probe, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(!granted);
    }
}
