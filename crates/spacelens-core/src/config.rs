//! Engine configuration.
//!
//! Every tuned constant lives here so it can be adjusted without touching
//! the algorithms. The gap threshold and the operating-system footprint cap
//! in particular are product-tuned values rather than derived ones.
//!
//! A config file is plain JSON; any omitted field takes its default.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DiskError, Result};

/// 1 KiB in bytes.
pub const KIB: u64 = 1024;
/// 1 GiB in bytes.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Hard upper bound for the scan depth, regardless of configuration.
pub const MAX_DEPTH_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds a cached scan stays valid.
    pub cache_ttl_secs: u64,
    /// Deepest scan a caller may request (capped at [`MAX_DEPTH_LIMIT`]).
    pub max_depth: u32,
    /// Depth used when the caller does not pass one.
    pub default_depth: u32,
    /// Children kept per directory before the rest is folded away.
    pub default_fanout: usize,
    /// The scan root is processed in parallel only above this entry count.
    pub parallel_threshold: usize,
    /// Upper bound for the worker pool (also bounded by CPU count).
    pub max_workers: usize,
    /// Unaccounted bytes above this produce a protected-gap node.
    pub gap_threshold_bytes: u64,
    /// Largest share of the reconciliation gap attributed to the OS bucket.
    pub os_footprint_cap_bytes: u64,
    /// Protected folders measuring below this are re-measured by the shell query.
    pub suspicious_size_bytes: u64,
    /// Folder names whose contents the OS hides from unprivileged listing.
    pub protected_folder_names: Vec<String>,
    /// Entry names silently left out of scans.
    pub skip_names: Vec<String>,
    /// Command line for whole-subtree measurement; the path is appended.
    /// The first token of the output must be a KiB count.
    pub disk_usage_command: Vec<String>,
    /// Command line for bulk recursive removal; the path is appended.
    pub removal_command: Vec<String>,
    pub disk_usage_timeout_secs: u64,
    pub shell_query_timeout_secs: u64,
    pub removal_timeout_secs: u64,
    /// Root observed by the change notifier; defaults to the home directory.
    pub watch_root: Option<PathBuf>,
    /// Holding area for recoverable deletions; defaults to the platform trash.
    pub recovery_dir: Option<PathBuf>,
    /// Idle seconds before a keepalive record is produced.
    pub keepalive_secs: u64,
    /// Capacity of the change-event queue.
    pub event_queue_capacity: usize,
    /// Depth (watch root = 1) of the ancestor reported as `affectedRoot`.
    pub affected_root_depth: usize,
    /// Extra substrings that mark a path as noise for the notifier.
    pub extra_noise_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 120,
            max_depth: MAX_DEPTH_LIMIT,
            default_depth: 4,
            default_fanout: 500,
            parallel_threshold: 4,
            max_workers: 8,
            gap_threshold_bytes: 100 * KIB,
            os_footprint_cap_bytes: 20 * GIB,
            suspicious_size_bytes: KIB,
            protected_folder_names: ["Messages", "Safari", "Mail", "Photos Library.photoslibrary"]
                .into_iter()
                .map(String::from)
                .collect(),
            skip_names: vec![".DS_Store".into(), ".localized".into()],
            disk_usage_command: vec!["du".into(), "-sk".into()],
            removal_command: vec!["rm".into(), "-rf".into(), "--".into()],
            disk_usage_timeout_secs: 60,
            shell_query_timeout_secs: 8,
            removal_timeout_secs: 300,
            watch_root: None,
            recovery_dir: None,
            keepalive_secs: 20,
            event_queue_capacity: 500,
            affected_root_depth: 2,
            extra_noise_patterns: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str::<Self>(&text).map_err(|e| {
                    DiskError::Config(format!("{}: {e}", path.display()))
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(DiskError::Config("max_depth must be at least 1".into()));
        }
        if self.max_workers == 0 {
            return Err(DiskError::Config("max_workers must be at least 1".into()));
        }
        if self.default_fanout == 0 {
            return Err(DiskError::Config("default_fanout must be at least 1".into()));
        }
        if self.event_queue_capacity == 0 {
            return Err(DiskError::Config(
                "event_queue_capacity must be at least 1".into(),
            ));
        }
        if self.keepalive_secs == 0 {
            return Err(DiskError::Config("keepalive_secs must be at least 1".into()));
        }
        if self.disk_usage_command.is_empty() || self.removal_command.is_empty() {
            return Err(DiskError::Config("external commands must not be empty".into()));
        }
        Ok(())
    }

    /// Effective maximum depth, never above [`MAX_DEPTH_LIMIT`].
    pub fn depth_limit(&self) -> u32 {
        self.max_depth.clamp(1, MAX_DEPTH_LIMIT)
    }

    /// Clamp a requested depth into `[1, depth_limit]`.
    pub fn clamp_depth(&self, depth: Option<u32>) -> u32 {
        depth
            .unwrap_or(self.default_depth)
            .clamp(1, self.depth_limit())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    /// Worker count: `min(max_workers, available parallelism)`.
    pub fn worker_count(&self) -> usize {
        self.max_workers.min(num_cpus::get()).max(1)
    }
}
