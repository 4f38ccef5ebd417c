/// Recoverable deletion: move the target into the recovery holding area.
///
/// A single rename is tried first. When that fails (protected descendants,
/// a different filesystem) the tree is moved file by file, recreating its
/// structure under the destination and removing source directories as
/// they empty out. Whatever cannot be moved stays where it was.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::outcome::DeletionOutcome;
use super::{census, entry_exists, remaining_entries, walk_entries};

/// First free name for `name` inside `dir`: `name`, then `stem 1.ext`,
/// `stem 2.ext`, ... Existing entries are never overwritten.
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !entry_exists(&candidate) {
        return candidate;
    }
    let as_path = Path::new(name);
    let (stem, ext) = match (as_path.file_stem(), as_path.extension()) {
        (Some(stem), Some(ext)) => (
            stem.to_string_lossy().into_owned(),
            format!(".{}", ext.to_string_lossy()),
        ),
        _ => (name.to_string(), String::new()),
    };
    (1u64..)
        .map(|n| dir.join(format!("{stem} {n}{ext}")))
        .find(|path| !entry_exists(path))
        .unwrap_or(candidate)
}

pub fn move_to_recoverable(target: &Path, recovery_dir: &Path) -> DeletionOutcome {
    let Some(name) = target.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return DeletionOutcome::full_denial(target.to_path_buf());
    };
    if let Err(err) = fs::create_dir_all(recovery_dir) {
        debug!("Cannot prepare {}: {err}", recovery_dir.display());
        return DeletionOutcome::full_denial(target.to_path_buf());
    }

    let total = census(target);
    let destination = unique_destination(recovery_dir, &name);
    match fs::rename(target, &destination) {
        Ok(()) => {
            info!("Moved {} to {}", target.display(), destination.display());
            return DeletionOutcome::complete(total);
        }
        Err(err) => debug!(
            "Bulk move of {} failed ({err}); moving entries individually",
            target.display()
        ),
    }

    let is_dir = fs::symlink_metadata(target)
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return match move_entry(target, &destination) {
            Ok(()) => DeletionOutcome::complete(total),
            Err(err) => {
                debug!("Cannot move {}: {err}", target.display());
                DeletionOutcome::full_denial(target.to_path_buf())
            }
        };
    }

    for (path, is_dir) in walk_entries(target).into_iter().rev() {
        let Ok(relative) = path.strip_prefix(target) else { continue };
        let dest = destination.join(relative);
        let result = if is_dir {
            fs::create_dir_all(&dest).and_then(|()| fs::remove_dir(&path))
        } else {
            dest.parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| move_entry(&path, &dest))
        };
        if let Err(err) = result {
            debug!("Cannot move {}: {err}", path.display());
        }
    }
    prune_unmoved_dirs(target, &destination);

    let outcome = DeletionOutcome::from_remaining(total, remaining_entries(target));
    info!(
        "Moved {} entries of {} to {}, {} left",
        outcome.deleted_count,
        target.display(),
        destination.display(),
        outcome.skipped_paths.len()
    );
    outcome
}

/// Move a single non-directory entry, copying across filesystems.
fn move_entry(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if crosses_devices(&err) => {
            copy_entry(src, dest)?;
            fs::remove_file(src).inspect_err(|_| {
                // Keep exactly one copy.
                let _ = fs::remove_file(dest);
            })
        }
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn copy_entry(src: &Path, dest: &Path) -> io::Result<()> {
    if fs::symlink_metadata(src)?.file_type().is_symlink() {
        return std::os::unix::fs::symlink(fs::read_link(src)?, dest);
    }
    fs::copy(src, dest).map(|_| ())
}

#[cfg(not(unix))]
fn copy_entry(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest).map(|_| ())
}

#[cfg(unix)]
fn crosses_devices(err: &io::Error) -> bool {
    err.raw_os_error() == Some(nix::errno::Errno::EXDEV as i32)
}

#[cfg(not(unix))]
fn crosses_devices(_err: &io::Error) -> bool {
    false
}

/// Remove directories the fallback created under `destination` for source
/// directories that are still in place and ended up with nothing moved
/// into them. Directories that did move keep their copy, empty or not.
fn prune_unmoved_dirs(target: &Path, destination: &Path) {
    for (path, is_dir) in walk_entries(destination).into_iter().rev() {
        let Ok(relative) = path.strip_prefix(destination) else { continue };
        if is_dir && entry_exists(&target.join(relative)) {
            let _ = fs::remove_dir(&path);
        }
    }
}
