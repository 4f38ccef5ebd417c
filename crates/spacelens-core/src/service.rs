/// `StorageService` — the single entry point front ends talk to.
///
/// Owns the worker pool, probe, scanner, cache, categorizer, deletion
/// engine and change notifier, wired from one [`EngineConfig`]. All
/// operations take `&self`; the service can be shared behind an `Arc`.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::analysis::{clean_targets, CategoryBucket, CategoryPlan, Categorizer, CleanTarget};
use crate::cache::{CacheKey, ResultCache};
use crate::config::EngineConfig;
use crate::delete::{DeletionEngine, DeletionOutcome, DenyList, RemovalSettings};
use crate::error::Result;
use crate::model::Node;
use crate::monitor::{ChangeNotifier, NotifierSettings};
use crate::platform::{
    browse_roots, check_permissions, default_recovery_dir, home_dir, volume_usage,
    PermissionReport, RootEntry,
};
use crate::scanner::{build_worker_pool, ProbeSettings, ScanSettings, SizeProbe, TreeScanner};

/// Volume totals plus the categorized breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage_percent: f64,
    pub categories: Vec<CategoryBucket>,
}

pub struct StorageService {
    config: EngineConfig,
    home: PathBuf,
    recovery_dir: PathBuf,
    volume_root: PathBuf,
    probe: Arc<SizeProbe>,
    scanner: TreeScanner,
    cache: Arc<ResultCache>,
    categorizer: Categorizer,
    deleter: DeletionEngine,
    notifier: Arc<ChangeNotifier>,
}

impl StorageService {
    /// Build a service for the current user.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let home = home_dir()?;
        Self::with_home(config, home)
    }

    /// Build a service treating `home` as the user's home directory.
    pub fn with_home(config: EngineConfig, home: PathBuf) -> Result<Self> {
        config.validate()?;
        let recovery_dir = config
            .recovery_dir
            .clone()
            .unwrap_or_else(|| default_recovery_dir(&home));

        let pool = Arc::new(build_worker_pool(&config)?);
        let probe = Arc::new(SizeProbe::new(ProbeSettings::from(&config)));
        let scanner = TreeScanner::new(
            Arc::clone(&probe),
            Arc::clone(&pool),
            ScanSettings::from(&config),
        );
        let cache = Arc::new(ResultCache::new(config.cache_ttl()));
        let categorizer = Categorizer::new(
            Arc::clone(&probe),
            pool,
            CategoryPlan::standard(&home),
            config.skip_names.clone(),
            config.os_footprint_cap_bytes,
        );
        let notifier = Arc::new(ChangeNotifier::new(NotifierSettings::from_config(
            &config,
            &home,
            &recovery_dir,
        )));
        let deleter = DeletionEngine::new(
            DenyList::standard(&home, &recovery_dir),
            RemovalSettings {
                command: config.removal_command.clone(),
                timeout: std::time::Duration::from_secs(config.removal_timeout_secs),
            },
            recovery_dir.clone(),
            Arc::clone(&cache),
            notifier.emitter(),
        );

        info!(
            "Storage service ready (home {}, recovery area {})",
            home.display(),
            recovery_dir.display()
        );
        Ok(Self {
            config,
            home,
            recovery_dir,
            volume_root: PathBuf::from("/"),
            probe,
            scanner,
            cache,
            categorizer,
            deleter,
            notifier,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn recovery_dir(&self) -> &Path {
        &self.recovery_dir
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Scan `path`, served from the cache while a result for the same
    /// `(path, depth, fanout)` is fresh.
    ///
    /// `depth` defaults to the configured depth and is clamped to
    /// `[1, max_depth]`. Missing or non-directory roots are rejected before
    /// the cache is consulted.
    pub fn scan(&self, path: &Path, depth: Option<u32>, fanout: Option<usize>) -> Result<Arc<Node>> {
        let root = TreeScanner::resolve_root(path)?;
        let depth = self.config.clamp_depth(depth);
        let fanout = fanout.unwrap_or(self.config.default_fanout).max(1);
        self.cache
            .get_or_scan(CacheKey::new(root.clone(), depth, fanout), || {
                self.scanner.scan(&root, depth, fanout)
            })
    }

    /// Root volume totals and the reconciled category breakdown.
    pub fn disk_info(&self) -> Result<DiskInfo> {
        let usage = volume_usage(&self.volume_root)?;
        let categories = self.categorizer.categorize_against(usage.used);
        Ok(DiskInfo {
            total: usage.total,
            used: usage.used,
            free: usage.free,
            usage_percent: usage.usage_percent(),
            categories,
        })
    }

    /// Delete `path` permanently or move it to the recovery area.
    pub fn delete(&self, path: &Path, permanent: bool) -> Result<DeletionOutcome> {
        self.deleter.delete(path, permanent)
    }

    pub fn clean_targets(&self) -> Vec<CleanTarget> {
        clean_targets(&self.probe, &self.home, &self.recovery_dir)
    }

    pub fn roots(&self) -> Vec<RootEntry> {
        browse_roots(&self.home)
    }

    pub fn check_permissions(&self) -> PermissionReport {
        check_permissions(&self.home)
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Start the change notifier on the configured watch root.
    pub fn start_watching(&self) -> Result<()> {
        self.notifier.start_default()
    }
}
