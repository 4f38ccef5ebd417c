/// Result cache — TTL-bounded memo of completed scans.
///
/// Entries are keyed by `(path, depth, fanout)` and hold the sealed tree
/// behind an `Arc`, so a hit is a pointer copy. The lock guards a single
/// map access at a time; scanning always happens outside it.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::model::Node;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub depth: u32,
    pub fanout: usize,
}

impl CacheKey {
    pub fn new(path: impl Into<PathBuf>, depth: u32, fanout: usize) -> Self {
        Self {
            path: path.into(),
            depth,
            fanout,
        }
    }
}

struct CacheEntry {
    stored_at: Instant,
    node: Arc<Node>,
}

pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry. Expired entries are removed and reported absent.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Node>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(Arc::clone(&entry.node)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: CacheKey, node: Arc<Node>) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                node,
            },
        );
    }

    /// Drop cached results affected by a change at `path`.
    ///
    /// Any change can make ancestor totals stale under every key, so the
    /// whole cache is cleared whether or not a path is given.
    pub fn invalidate(&self, path: Option<&Path>) {
        let mut entries = self.entries.lock();
        let cleared = entries.len();
        entries.clear();
        match path {
            Some(path) => debug!("Cache invalidated for {} ({cleared} entries)", path.display()),
            None => debug!("Cache cleared ({cleared} entries)"),
        }
    }

    /// Number of stored entries, including any not yet found expired.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-through lookup: return the cached tree or run `scan` and store
    /// its result. Failures are returned without being cached.
    pub fn get_or_scan<F>(&self, key: CacheKey, scan: F) -> Result<Arc<Node>>
    where
        F: FnOnce() -> Result<Node>,
    {
        if let Some(node) = self.get(&key) {
            debug!("Cache hit for {}", key.path.display());
            return Ok(node);
        }
        debug!("Cache miss for {}", key.path.display());
        let node = Arc::new(scan()?);
        self.put(key, Arc::clone(&node));
        Ok(node)
    }
}
