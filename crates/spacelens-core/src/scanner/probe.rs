//! SizeProbe: physical on-disk size of a file or a whole subtree.
//!
//! Sizing is an ordered list of strategies ("tiers"). Each tier either
//! produces a measurement or reports that it does not apply, and the next
//! tier is only consulted when the previous one is unavailable or produced
//! an implausible value:
//!
//! 1. [`Tier::DirectEnumeration`] — read the directory without following
//!    symlinks and sum `blocks * 512` per file, recursing per subdirectory.
//! 2. [`Tier::DiskUsageTool`] — an external whole-subtree measurement
//!    (`du -sk` by default) for subtrees that cannot be listed.
//! 3. [`Tier::ShellQuery`] — the desktop shell's own size query, only for a
//!    small set of protected folder names that the OS exposes to ordinary
//!    listing as near-empty placeholders.
//!
//! Failures are isolated per entry: an unreadable child falls through the
//! tiers on its own and never aborts the sizing of its siblings.
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::external::{self, ToolFailure};
use crate::config::EngineConfig;

/// One sizing strategy, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    DirectEnumeration,
    DiskUsageTool,
    ShellQuery,
}

impl Tier {
    /// The fixed fallback order.
    pub const ORDER: [Tier; 3] = [Tier::DirectEnumeration, Tier::DiskUsageTool, Tier::ShellQuery];

    pub fn label(self) -> &'static str {
        match self {
            Self::DirectEnumeration => "direct enumeration",
            Self::DiskUsageTool => "disk-usage tool",
            Self::ShellQuery => "shell query",
        }
    }
}

/// Result of running a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierResult {
    Measured(u64),
    /// The tier could not read the path (permission denied or similar).
    Denied,
    /// The tier does not apply here or its helper failed.
    NotApplicable,
}

/// Settings the probe needs, lifted out of [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub protected_folder_names: Vec<String>,
    pub suspicious_size_bytes: u64,
    pub disk_usage_command: Vec<String>,
    pub disk_usage_timeout: Duration,
    pub shell_query_timeout: Duration,
}

impl From<&EngineConfig> for ProbeSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            protected_folder_names: config.protected_folder_names.clone(),
            suspicious_size_bytes: config.suspicious_size_bytes,
            disk_usage_command: config.disk_usage_command.clone(),
            disk_usage_timeout: Duration::from_secs(config.disk_usage_timeout_secs),
            shell_query_timeout: Duration::from_secs(config.shell_query_timeout_secs),
        }
    }
}

/// Physical size of one entry from its (non-followed) metadata.
#[cfg(unix)]
pub fn physical_size(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.blocks().saturating_mul(512)
}

#[cfg(not(unix))]
pub fn physical_size(meta: &Metadata) -> u64 {
    meta.len()
}

/// Physical size of a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtreeSize {
    /// Blocks held by files and symlinks. This is what nodes report.
    pub bytes: u64,
    /// Blocks held by the directory entries themselves. Never part of a
    /// node size, but disk-usage tools count them.
    pub directory_bytes: u64,
}

impl SubtreeSize {
    pub fn data(bytes: u64) -> Self {
        Self {
            bytes,
            directory_bytes: 0,
        }
    }

    /// Everything a disk-usage tool would report for the subtree.
    pub fn on_disk(self) -> u64 {
        self.bytes.saturating_add(self.directory_bytes)
    }

    pub fn add(&mut self, other: SubtreeSize) {
        self.bytes = self.bytes.saturating_add(other.bytes);
        self.directory_bytes = self.directory_bytes.saturating_add(other.directory_bytes);
    }
}

#[derive(Debug, Clone)]
pub struct SizeProbe {
    settings: ProbeSettings,
}

impl SizeProbe {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// `true` if `name` is one of the folders the OS hides from listing.
    pub fn is_protected_name(&self, name: &str) -> bool {
        self.settings.protected_folder_names.iter().any(|n| n == name)
    }

    /// Tiers tried for a directory with the given name, in order.
    ///
    /// The disk-usage tool sees the same placeholders as direct listing for
    /// protected folders, and the shell query only knows about those
    /// folders, so each applies to one class only.
    pub fn tier_plan(&self, name: &str) -> Vec<Tier> {
        let protected = self.is_protected_name(name);
        Tier::ORDER
            .into_iter()
            .filter(|tier| match tier {
                Tier::DirectEnumeration => true,
                Tier::DiskUsageTool => !protected,
                Tier::ShellQuery => protected,
            })
            .collect()
    }

    /// Size of a single entry: files and symlinks by their own blocks,
    /// directories recursively.
    pub fn measure(&self, path: &Path) -> u64 {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => self.measure_tree(path),
            Ok(meta) => physical_size(&meta),
            Err(err) => {
                debug!("Cannot stat {}: {err}", path.display());
                self.measure_fallback(path)
            }
        }
    }

    /// Recursive physical size of the directory at `path`.
    ///
    /// Never fails: when every tier fails the contribution is zero.
    pub fn measure_tree(&self, path: &Path) -> u64 {
        self.measure_subtree(path).bytes
    }

    /// Like [`measure_tree`](Self::measure_tree), keeping the blocks held
    /// by the directories themselves as a separate tally.
    pub fn measure_subtree(&self, path: &Path) -> SubtreeSize {
        self.measure_with_plan(path, self.tier_plan(&name_of(path)))
    }

    /// Size of an entry that could not even be stat'ed: skip direct
    /// enumeration and go straight to the remaining tiers.
    pub fn measure_fallback(&self, path: &Path) -> u64 {
        let plan = self
            .tier_plan(&name_of(path))
            .into_iter()
            .filter(|t| *t != Tier::DirectEnumeration)
            .collect();
        self.measure_with_plan(path, plan).bytes
    }

    /// An independent whole-subtree measurement (the disk-usage tier), used
    /// to detect bytes that enumeration could not see.
    pub fn independent_measure(&self, path: &Path) -> Option<u64> {
        match self.run_tier(Tier::DiskUsageTool, path) {
            TierResult::Measured(bytes) => Some(bytes),
            TierResult::Denied | TierResult::NotApplicable => None,
        }
    }

    /// Run one tier in isolation.
    pub fn run_tier(&self, tier: Tier, path: &Path) -> TierResult {
        match tier {
            Tier::DirectEnumeration => self
                .enumerate(path)
                .map_or(TierResult::Denied, |size| TierResult::Measured(size.bytes)),
            Tier::DiskUsageTool => self.disk_usage(path),
            Tier::ShellQuery => self.shell_query(path),
        }
    }

    fn reading(&self, tier: Tier, path: &Path) -> Option<SubtreeSize> {
        match tier {
            Tier::DirectEnumeration => self.enumerate(path),
            // External tools fold directory blocks into their total.
            _ => match self.run_tier(tier, path) {
                TierResult::Measured(bytes) => Some(SubtreeSize::data(bytes)),
                TierResult::Denied | TierResult::NotApplicable => None,
            },
        }
    }

    fn measure_with_plan(&self, path: &Path, plan: Vec<Tier>) -> SubtreeSize {
        let protected = self.is_protected_name(&name_of(path));
        // Best implausible reading so far, used if no later tier does better.
        let mut fallback: Option<SubtreeSize> = None;

        for tier in plan {
            match self.reading(tier, path) {
                Some(size) if protected && size.bytes < self.settings.suspicious_size_bytes => {
                    debug!(
                        "{} reported {} B for protected {}; trying next tier",
                        tier.label(),
                        size.bytes,
                        path.display()
                    );
                    if fallback.map_or(true, |best| size.bytes > best.bytes) {
                        fallback = Some(size);
                    }
                }
                Some(size) => return size,
                None => debug!("{} unavailable for {}", tier.label(), path.display()),
            }
        }

        fallback.unwrap_or_default()
    }

    /// Tier 1: list the directory and sum physical sizes, recursing per
    /// subdirectory through the full tier pipeline.
    fn enumerate(&self, dir: &Path) -> Option<SubtreeSize> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Cannot list {}: {err}", dir.display());
                return None;
            }
        };

        let mut total = SubtreeSize {
            bytes: 0,
            directory_bytes: fs::symlink_metadata(dir).map_or(0, |m| physical_size(&m)),
        };
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            let size = match entry.metadata() {
                // DirEntry::metadata does not traverse symlinks.
                Ok(meta) if meta.is_dir() => self.measure_subtree(&path),
                Ok(meta) => SubtreeSize::data(physical_size(&meta)),
                Err(_) => SubtreeSize::data(self.measure_fallback(&path)),
            };
            total.add(size);
        }
        Some(total)
    }

    /// Tier 2: external disk-usage helper.
    fn disk_usage(&self, path: &Path) -> TierResult {
        let argv = &self.settings.disk_usage_command;
        let program = argv.first().map(String::as_str).unwrap_or_default();
        let result = external::run(argv, &[path], self.settings.disk_usage_timeout)
            .and_then(|out| external::parse_kib_total(program, &out.stdout));
        match result {
            Ok(bytes) => TierResult::Measured(bytes),
            Err(err) => {
                log_tool_failure(&err, path);
                TierResult::NotApplicable
            }
        }
    }

    /// Tier 3: ask the desktop shell (Finder) for the folder size.
    #[cfg(target_os = "macos")]
    fn shell_query(&self, path: &Path) -> TierResult {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let escaped = absolute
            .to_string_lossy()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        let script =
            format!("tell application \"Finder\" to get size of (POSIX file \"{escaped}\")");
        let argv = vec!["osascript".to_string(), "-e".to_string(), script];
        let result = external::run::<&str>(&argv, &[], self.settings.shell_query_timeout)
            .and_then(|out| external::parse_byte_count("osascript", &out.stdout));
        match result {
            Ok(bytes) => TierResult::Measured(bytes),
            Err(err) => {
                log_tool_failure(&err, path);
                TierResult::NotApplicable
            }
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn shell_query(&self, _path: &Path) -> TierResult {
        TierResult::NotApplicable
    }
}

fn log_tool_failure(err: &ToolFailure, path: &Path) {
    debug!("Size helper failed for {}: {err}", path.display());
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn probe_with(disk_usage: &[&str]) -> SizeProbe {
        let mut settings = ProbeSettings::from(&EngineConfig::default());
        settings.disk_usage_command = disk_usage.iter().map(|s| s.to_string()).collect();
        SizeProbe::new(settings)
    }

    fn write_bytes(path: &Path, n: usize) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(&vec![7u8; n]).unwrap();
    }

    #[test]
    fn tier_plan_depends_on_folder_name() {
        let probe = probe_with(&["du", "-sk"]);
        assert_eq!(
            probe.tier_plan("Projects"),
            vec![Tier::DirectEnumeration, Tier::DiskUsageTool]
        );
        assert_eq!(
            probe.tier_plan("Messages"),
            vec![Tier::DirectEnumeration, Tier::ShellQuery]
        );
    }

    #[test]
    fn tree_size_covers_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        write_bytes(&tmp.path().join("a/one.bin"), 5000);
        write_bytes(&tmp.path().join("a/b/two.bin"), 9000);

        let probe = probe_with(&["du", "-sk"]);
        let one = probe.measure(&tmp.path().join("a/one.bin"));
        let two = probe.measure(&tmp.path().join("a/b/two.bin"));
        assert_eq!(probe.measure_tree(tmp.path()), one + two);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("big.bin");
        write_bytes(&target, 256 * 1024);
        let inner = tmp.path().join("inner");
        fs::create_dir(&inner).unwrap();
        std::os::unix::fs::symlink(&target, inner.join("link")).unwrap();
        // A cycle must not hang the probe.
        std::os::unix::fs::symlink(tmp.path(), inner.join("loop")).unwrap();

        let probe = probe_with(&["du", "-sk"]);
        assert!(probe.measure_tree(&inner) < 256 * 1024);
    }

    #[cfg(unix)]
    #[test]
    fn directory_blocks_are_tallied_apart_from_data() {
        use std::os::unix::fs::MetadataExt;
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::create_dir(tmp.path().join("c")).unwrap();
        let own = |p: &Path| fs::symlink_metadata(p).unwrap().blocks() * 512;

        let probe = probe_with(&["du", "-sk"]);
        let size = probe.measure_subtree(tmp.path());
        assert_eq!(size.bytes, 0);
        assert_eq!(
            size.directory_bytes,
            own(tmp.path()) + own(&tmp.path().join("a")) + own(&tmp.path().join("a/b"))
                + own(&tmp.path().join("c"))
        );
        assert_eq!(probe.measure_tree(tmp.path()), 0);
    }

    #[test]
    fn independent_measure_uses_disk_usage_command() {
        let tmp = tempfile::tempdir().unwrap();
        let probe = probe_with(&["sh", "-c", "echo 7", "sh"]);
        assert_eq!(probe.independent_measure(tmp.path()), Some(7 * 1024));
    }

    #[test]
    fn missing_helper_counts_as_zero() {
        let probe = probe_with(&["spacelens-no-such-du"]);
        let missing = Path::new("/definitely/not/here/spacelens");
        assert_eq!(probe.independent_measure(missing), None);
        assert_eq!(probe.measure_tree(missing), 0);
        assert_eq!(probe.measure(missing), 0);
    }

    #[test]
    fn unreadable_directory_falls_through_to_disk_usage() {
        let probe = probe_with(&["sh", "-c", "echo 3", "sh"]);
        // Listing a missing path fails, so tier 2 answers.
        let missing = Path::new("/definitely/not/here/spacelens");
        assert_eq!(probe.measure_tree(missing), 3 * 1024);
    }

    #[test]
    fn protected_name_with_placeholder_size_keeps_best_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let messages = tmp.path().join("Messages");
        fs::create_dir(&messages).unwrap();
        let probe = probe_with(&["du", "-sk"]);
        // Enumeration reads 0 B (implausible); off macOS there is no shell
        // query, so the best reading stands.
        let size = probe.measure_tree(&messages);
        if !cfg!(target_os = "macos") {
            assert_eq!(size, 0);
        }
    }
}
