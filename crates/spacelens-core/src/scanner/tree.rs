//! TreeScanner: a bounded-depth, bounded-fanout node tree for one root.
//!
//! The root's entries are processed on the shared worker pool when there
//! are enough of them to be worth it; everything below the root runs
//! sequentially so deep trees cannot multiply thread or memory use.
//! Directories at the last level of the depth budget are collapsed into a
//! size-only node measured by the [`SizeProbe`].
//!
//! # Accuracy
//!
//! For the root and its immediate children the enumerated total is checked
//! against an independent whole-subtree measurement. Anything above the gap
//! threshold that enumeration could not see is surfaced as a synthetic
//! [`NodeKind::ProtectedGap`] child, so denied content is always visible as
//! a quantified gap rather than silently missing.
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info};

use super::probe::{physical_size, SizeProbe, SubtreeSize};
use crate::config::EngineConfig;
use crate::error::{DiskError, Result};
use crate::model::size::{format_count, format_size};
use crate::model::{display_order, size_order, Node};

/// Settings the scanner needs, lifted out of [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub depth_limit: u32,
    pub parallel_threshold: usize,
    pub gap_threshold_bytes: u64,
    pub skip_names: Vec<String>,
}

impl From<&EngineConfig> for ScanSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            depth_limit: config.depth_limit(),
            parallel_threshold: config.parallel_threshold,
            gap_threshold_bytes: config.gap_threshold_bytes,
            skip_names: config.skip_names.clone(),
        }
    }
}

/// A child node plus whether its directory listing was denied.
struct Scanned {
    node: Node,
    unreadable: bool,
    /// Blocks held by directory entries in this subtree, kept out of
    /// `node` sizes but needed to compare against a disk-usage total.
    directory_bytes: u64,
}

impl Scanned {
    fn collapsed(path: &Path, size: SubtreeSize, unreadable: bool) -> Self {
        Self {
            node: Node::collapsed_directory(path, size.bytes),
            unreadable,
            directory_bytes: size.directory_bytes,
        }
    }
}

/// What a directory holds besides its child nodes' sizes.
#[derive(Clone, Copy)]
struct Overhead {
    restricted: u64,
    directory_bytes: u64,
}

pub struct TreeScanner {
    probe: Arc<SizeProbe>,
    pool: Arc<ThreadPool>,
    settings: ScanSettings,
}

impl TreeScanner {
    pub fn new(probe: Arc<SizeProbe>, pool: Arc<ThreadPool>, settings: ScanSettings) -> Self {
        Self {
            probe,
            pool,
            settings,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Normalise and validate a scan root: it must exist and be a directory
    /// (symlinks to directories are accepted).
    pub fn resolve_root(root: &Path) -> Result<PathBuf> {
        let absolute = std::path::absolute(root)?;
        match fs::metadata(&absolute) {
            Ok(meta) if meta.is_dir() => Ok(absolute),
            Ok(_) => Err(DiskError::NotADirectory(absolute)),
            Err(_) => Err(DiskError::NotFound(absolute)),
        }
    }

    /// Scan `root` to `depth` levels, keeping at most `fanout` children per
    /// directory.
    ///
    /// `depth` is clamped to `[1, depth_limit]` and `fanout` to at least 1.
    /// Only invalid input fails; unreadable content inside the tree is
    /// reported through gap nodes and fallback sizes.
    pub fn scan(&self, root: &Path, depth: u32, fanout: usize) -> Result<Node> {
        let root = Self::resolve_root(root)?;
        let depth = depth.clamp(1, self.settings.depth_limit);
        let fanout = fanout.max(1);

        info!("Scanning {} (depth {depth}, fanout {fanout})", root.display());
        let start = Instant::now();
        let scanned = self.scan_dir(&root, depth, fanout, 0);
        info!(
            "Scan of {} complete: {} in {} top-level items, {:?}",
            root.display(),
            format_size(scanned.node.size_bytes),
            format_count(scanned.node.children.len() as u64),
            start.elapsed()
        );
        Ok(scanned.node)
    }

    fn scan_dir(&self, path: &Path, depth: u32, fanout: usize, level: u32) -> Scanned {
        let entries: Vec<DirEntry> = match fs::read_dir(path) {
            Ok(iter) => iter.filter_map(|e| e.ok()).collect(),
            Err(err) => {
                debug!("Cannot list {}: {err}; using fallback size", path.display());
                return Scanned::collapsed(path, self.probe.measure_subtree(path), true);
            }
        };

        let scanned: Vec<Scanned> =
            if level == 0 && entries.len() > self.settings.parallel_threshold {
                self.pool.install(|| {
                    entries
                        .par_iter()
                        .filter_map(|entry| self.scan_entry(entry, depth, fanout, level))
                        .collect()
                })
            } else {
                entries
                    .iter()
                    .filter_map(|entry| self.scan_entry(entry, depth, fanout, level))
                    .collect()
            };

        let restricted = scanned.iter().filter(|s| s.unreadable).count() as u64;
        let own_blocks = fs::metadata(path).map_or(0, |m| physical_size(&m));
        let directory_bytes = scanned
            .iter()
            .fold(own_blocks, |acc, s| acc.saturating_add(s.directory_bytes));
        let children: Vec<Node> = scanned.into_iter().map(|s| s.node).collect();
        let overhead = Overhead {
            restricted,
            directory_bytes,
        };
        Scanned {
            node: self.seal_directory(path, children, fanout, level, overhead),
            unreadable: false,
            directory_bytes,
        }
    }

    fn scan_entry(&self, entry: &DirEntry, depth: u32, fanout: usize, level: u32) -> Option<Scanned> {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if self.settings.skip_names.iter().any(|s| s == name.as_ref()) {
            return None;
        }
        let path = entry.path();

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                debug!("Cannot stat {}: {err}", path.display());
                // Only directories are worth estimating; an unreadable file
                // has nothing more to offer.
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                return is_dir.then(|| {
                    let size = SubtreeSize::data(self.probe.measure_fallback(&path));
                    Scanned::collapsed(&path, size, true)
                });
            }
        };

        let file_type = meta.file_type();
        if file_type.is_symlink() || file_type.is_file() {
            return Some(Scanned {
                node: Node::file(&path, physical_size(&meta)),
                unreadable: false,
                directory_bytes: 0,
            });
        }
        if !file_type.is_dir() {
            // Sockets, FIFOs and device nodes occupy no data blocks worth showing.
            return None;
        }

        if depth > 1 {
            Some(self.scan_dir(&path, depth - 1, fanout, level + 1))
        } else {
            Some(Scanned::collapsed(&path, self.probe.measure_subtree(&path), false))
        }
    }

    /// Order children, attach gap and truncation sentinels, and build the
    /// final directory node.
    fn seal_directory(
        &self,
        path: &Path,
        mut children: Vec<Node>,
        fanout: usize,
        level: u32,
        overhead: Overhead,
    ) -> Node {
        let enumerated: u64 = children.iter().map(|c| c.size_bytes).sum();

        // Gap detection runs strictly after all children have joined.
        let gap = if level <= 1 {
            self.detect_gap(path, enumerated, overhead)
        } else {
            None
        };

        let mut truncated = None;
        if children.len() > fanout {
            children.sort_by(size_order);
            let folded = children.split_off(fanout);
            let folded_bytes = folded.iter().map(|c| c.size_bytes).sum();
            truncated = Some(Node::truncated(path, folded_bytes, folded.len() as u64));
        }

        children.sort_by(display_order);
        let has_more = truncated.is_some();
        children.extend(gap);
        children.extend(truncated);
        Node::directory(path, children, has_more)
    }

    fn detect_gap(&self, path: &Path, enumerated: u64, overhead: Overhead) -> Option<Node> {
        let Overhead {
            restricted,
            directory_bytes,
        } = overhead;
        let measured = self.probe.independent_measure(path)?;
        // The independent total includes directory blocks; node sizes don't.
        let gap = measured.saturating_sub(enumerated.saturating_add(directory_bytes));
        if gap > self.settings.gap_threshold_bytes {
            debug!(
                "{} unaccounted in {} ({restricted} restricted subdirectories)",
                format_size(gap),
                path.display()
            );
            Some(Node::protected_gap(path, gap, restricted))
        } else {
            None
        }
    }
}
