/// Permanent deletion: one bulk native removal, then a bottom-up sweep
/// that salvages whatever the bulk call could not remove.
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use super::outcome::DeletionOutcome;
use super::{census, entry_exists, remaining_entries, walk_entries};
use crate::scanner::external::{self, ToolFailure};

#[derive(Debug, Clone)]
pub struct RemovalSettings {
    /// Bulk removal command line; the target path is appended.
    pub command: Vec<String>,
    pub timeout: Duration,
}

pub fn delete_permanently(target: &Path, settings: &RemovalSettings) -> DeletionOutcome {
    let total = census(target);
    bulk_remove(target, settings);

    if !entry_exists(target) {
        return DeletionOutcome::complete(total);
    }
    let is_dir = fs::symlink_metadata(target)
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return DeletionOutcome::full_denial(target.to_path_buf());
    }

    debug!("Bulk removal left {} behind; sweeping bottom-up", target.display());
    // Depth-first order lists parents before children; reversed, every
    // entry is visited after everything inside it.
    for (path, is_dir) in walk_entries(target).into_iter().rev() {
        let result = if is_dir {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(err) = result {
            debug!("Cannot remove {}: {err}", path.display());
        }
    }

    let outcome = DeletionOutcome::from_remaining(total, remaining_entries(target));
    info!(
        "Permanent delete of {}: {} removed, {} left",
        target.display(),
        outcome.deleted_count,
        outcome.skipped_paths.len()
    );
    outcome
}

/// Try the native bulk removal tool, or the std equivalent when the tool
/// cannot be started. Failures are fine here: the caller inspects what is
/// left on disk.
fn bulk_remove(target: &Path, settings: &RemovalSettings) {
    match external::run(&settings.command, &[target], settings.timeout) {
        Ok(output) if output.status.success() => {}
        Ok(output) => debug!("Bulk removal exited with {}", output.status),
        Err(ToolFailure::Missing { program, source }) => {
            debug!("Removal helper {program} unavailable ({source}); using std removal");
            let result = match fs::symlink_metadata(target) {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(target),
                Ok(_) => fs::remove_file(target),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                debug!("std removal of {} failed: {err}", target.display());
            }
        }
        Err(err) => debug!("Bulk removal failed: {err}"),
    }
}
