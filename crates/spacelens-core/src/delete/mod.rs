/// Deletion engine — permanent removal and recoverable moves, guarded by a
/// deny-list and reported as counted outcomes.
///
/// Partial success is normal (protected descendants, locked folders), so
/// outcomes carry the exact list of entries left behind rather than
/// failing. Only deny-listed and missing targets are errors.
pub mod guard;
pub mod outcome;
pub mod permanent;
pub mod recoverable;

pub use guard::DenyList;
pub use outcome::{DeletionOutcome, DeletionStatus};
pub use permanent::RemovalSettings;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::ResultCache;
use crate::error::{DiskError, Result};
use crate::monitor::{ChangeKind, EventEmitter};

pub struct DeletionEngine {
    guard: DenyList,
    removal: RemovalSettings,
    recovery_dir: PathBuf,
    cache: Arc<ResultCache>,
    events: EventEmitter,
}

impl DeletionEngine {
    pub fn new(
        guard: DenyList,
        removal: RemovalSettings,
        recovery_dir: PathBuf,
        cache: Arc<ResultCache>,
        events: EventEmitter,
    ) -> Self {
        Self {
            guard,
            removal,
            recovery_dir,
            cache,
            events,
        }
    }

    pub fn recovery_dir(&self) -> &Path {
        &self.recovery_dir
    }

    pub fn delete(&self, path: &Path, permanent: bool) -> Result<DeletionOutcome> {
        if permanent {
            self.delete_permanently(path)
        } else {
            self.move_to_recoverable(path)
        }
    }

    pub fn delete_permanently(&self, path: &Path) -> Result<DeletionOutcome> {
        let target = self.prepare(path)?;
        let outcome = permanent::delete_permanently(&target, &self.removal);
        Ok(self.finish(&target, outcome))
    }

    pub fn move_to_recoverable(&self, path: &Path) -> Result<DeletionOutcome> {
        let target = self.prepare(path)?;
        // Moving an ancestor of the holding area into itself cannot work.
        if self.recovery_dir.starts_with(&target) {
            warn!(
                "Refusing to move {} into its own recovery area",
                target.display()
            );
            return Err(DiskError::ProtectedPath(target));
        }
        let outcome = recoverable::move_to_recoverable(&target, &self.recovery_dir);
        Ok(self.finish(&target, outcome))
    }

    fn prepare(&self, path: &Path) -> Result<PathBuf> {
        let target = self.guard.check(path)?;
        if !entry_exists(&target) {
            return Err(DiskError::NotFound(target));
        }
        Ok(target)
    }

    /// Invalidate and notify whenever anything was removed, partial or not.
    fn finish(&self, target: &Path, outcome: DeletionOutcome) -> DeletionOutcome {
        match outcome.status() {
            DeletionStatus::Complete => info!(
                "Deleted {} ({} entries)",
                target.display(),
                outcome.deleted_count
            ),
            DeletionStatus::Partial => warn!(
                "Partially deleted {}: {} removed, {} left",
                target.display(),
                outcome.deleted_count,
                outcome.skipped_paths.len()
            ),
            DeletionStatus::FullDenial => {
                warn!("Nothing under {} could be removed", target.display())
            }
        }
        if outcome.deleted_count > 0 {
            self.cache.invalidate(Some(target));
            if let Some(parent) = target.parent() {
                self.cache.invalidate(Some(parent));
            }
            self.events.emit(ChangeKind::Deleted, target);
        }
        outcome
    }
}

/// `true` if something (including a dangling symlink) exists at `path`.
pub(crate) fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Every visible entry under and including `root` as `(path, is_dir)`, in
/// sorted depth-first order (parents before children). Symlinks are listed
/// but not followed, including a symlinked `root`, which is one entry.
pub(crate) fn walk_entries(root: &Path) -> Vec<(PathBuf, bool)> {
    match fs::symlink_metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return vec![(root.to_path_buf(), false)],
        Err(_) => return Vec::new(),
    }
    jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(jwalk::Parallelism::Serial)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| (entry.path(), entry.file_type().is_dir()))
        .collect()
}

/// Number of entries a deletion of `root` would remove.
pub(crate) fn census(root: &Path) -> u64 {
    walk_entries(root).len() as u64
}

/// Entries still present under (and including) `root`.
pub(crate) fn remaining_entries(root: &Path) -> Vec<PathBuf> {
    walk_entries(root).into_iter().map(|(path, _)| path).collect()
}
