/// Scanner module — sizes directories and builds bounded node trees.
///
/// Sizing goes through a three-tier strategy:
/// - **Tier 1 (direct):** walk the subtree and sum physical block usage.
/// - **Tier 2 (disk-usage helper):** ask an external `du`-style tool.
/// - **Tier 3 (shell query):** ask the desktop shell, which can see inside
///   folders the OS hides from ordinary listing.
///
/// The [`TreeScanner`] builds on the probe to produce a depth- and
/// fanout-limited tree, running the top level on a shared worker pool.
pub mod external;
pub mod probe;
pub mod tree;

pub use probe::{ProbeSettings, SizeProbe, SubtreeSize, Tier, TierResult};
pub use tree::{ScanSettings, TreeScanner};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{DiskError, Result};

/// Build the worker pool shared by the scanner and the categorizer.
///
/// Sized to `min(max_workers, CPUs)` so concurrent scans never fan out past
/// a fixed number of threads.
pub fn build_worker_pool(config: &EngineConfig) -> Result<ThreadPool> {
    let workers = config.worker_count();
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("spacelens-worker-{i}"))
        .build()
        .map_err(|e| DiskError::ThreadPool(e.to_string()))?;
    info!("Worker pool ready with {workers} threads");
    Ok(pool)
}
