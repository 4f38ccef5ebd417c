/// Storage breakdown by category.
///
/// Exhaustively classifying a whole volume is far too slow, so the
/// categorizer sizes a fixed set of well-known locations wholesale (in
/// parallel on the shared worker pool), classifies loose files in the home
/// root by extension, and then reconciles the total against the volume's
/// used bytes so the breakdown never undercounts.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tracing::{debug, info};

use super::file_types::{categorise_file_name, StorageCategory};
use crate::error::Result;
use crate::model::size::format_size;
use crate::platform::volume_usage;
use crate::scanner::probe::{physical_size, SizeProbe};

/// One slice of the storage breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBucket {
    #[serde(skip)]
    pub category: StorageCategory,
    pub name: &'static str,
    pub size_bytes: u64,
    pub color_token: &'static str,
}

impl CategoryBucket {
    pub fn new(category: StorageCategory, size_bytes: u64) -> Self {
        Self {
            category,
            name: category.label(),
            size_bytes,
            color_token: category.color_token(),
        }
    }
}

/// Which locations are measured and how they are classified.
#[derive(Debug, Clone, Default)]
pub struct CategoryPlan {
    /// Directories assigned wholesale to one category.
    pub locations: Vec<(PathBuf, StorageCategory)>,
    /// Directory whose direct children (minus `library_exclude`) count as
    /// system data.
    pub library: Option<PathBuf>,
    pub library_exclude: Vec<String>,
    /// Directory shallow-listed for loose files and unknown folders.
    pub home: Option<PathBuf>,
    /// Home entries already covered by `locations` or `library`.
    pub home_exclude: Vec<String>,
}

impl CategoryPlan {
    /// Standard plan: system-wide folders plus [`CategoryPlan::for_home`].
    pub fn standard(home: &Path) -> Self {
        let mut plan = Self::for_home(home);
        plan.locations.splice(
            0..0,
            [
                (PathBuf::from("/Applications"), StorageCategory::Apps),
                (PathBuf::from("/Users/Shared"), StorageCategory::Other),
            ],
        );
        plan
    }

    /// Plan covering a single home directory only.
    pub fn for_home(home: &Path) -> Self {
        use StorageCategory::*;
        let assigned: [(&str, StorageCategory); 9] = [
            ("Documents", Documents),
            ("Desktop", Documents),
            ("Applications", Apps),
            ("Pictures", Other),
            ("Music", Other),
            ("Movies", Other),
            ("Downloads", Other),
            ("Public", Other),
            ("Library/Developer", Other),
        ];

        let mut home_exclude: Vec<String> = assigned
            .iter()
            .filter(|(rel, _)| !rel.contains('/'))
            .map(|(rel, _)| (*rel).to_string())
            .collect();
        home_exclude.push("Library".into());

        Self {
            locations: assigned
                .iter()
                .map(|(rel, cat)| (home.join(rel), *cat))
                .collect(),
            library: Some(home.join("Library")),
            library_exclude: vec!["Developer".into()],
            home: Some(home.to_path_buf()),
            home_exclude,
        }
    }
}

pub struct Categorizer {
    probe: Arc<SizeProbe>,
    pool: Arc<ThreadPool>,
    plan: CategoryPlan,
    skip_names: Vec<String>,
    os_footprint_cap: u64,
    volume_root: PathBuf,
}

impl Categorizer {
    pub fn new(
        probe: Arc<SizeProbe>,
        pool: Arc<ThreadPool>,
        plan: CategoryPlan,
        skip_names: Vec<String>,
        os_footprint_cap: u64,
    ) -> Self {
        Self {
            probe,
            pool,
            plan,
            skip_names,
            os_footprint_cap,
            volume_root: PathBuf::from("/"),
        }
    }

    /// Volume whose used bytes the breakdown is reconciled against.
    pub fn with_volume_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.volume_root = root.into();
        self
    }

    /// Breakdown reconciled against the root volume's used bytes.
    pub fn categorize(&self) -> Result<Vec<CategoryBucket>> {
        let usage = volume_usage(&self.volume_root)?;
        Ok(self.categorize_against(usage.used))
    }

    /// Breakdown reconciled against an explicit used-bytes figure.
    pub fn categorize_against(&self, used: u64) -> Vec<CategoryBucket> {
        let start = Instant::now();
        let measured = self.measure_categories();
        let buckets = StorageCategory::SCANNED
            .iter()
            .filter_map(|cat| {
                let size = measured.get(cat).copied().unwrap_or(0);
                (size > 0 || cat.always_listed()).then(|| CategoryBucket::new(*cat, size))
            })
            .collect();
        let buckets = reconcile(buckets, used, self.os_footprint_cap);
        info!(
            "Categorized storage in {:?} ({} buckets, {} used)",
            start.elapsed(),
            buckets.len(),
            format_size(used)
        );
        buckets
    }

    /// Sum every planned location into its category.
    fn measure_categories(&self) -> BTreeMap<StorageCategory, u64> {
        let mut totals: BTreeMap<StorageCategory, u64> = BTreeMap::new();
        let mut tasks: Vec<(PathBuf, StorageCategory)> = self
            .plan
            .locations
            .iter()
            .filter(|(path, _)| path.is_dir())
            .cloned()
            .collect();

        if let Some(library) = &self.plan.library {
            self.collect_shallow(
                library,
                &self.plan.library_exclude,
                StorageCategory::SystemData,
                |_| StorageCategory::SystemData,
                &mut tasks,
                &mut totals,
            );
        }
        if let Some(home) = &self.plan.home {
            self.collect_shallow(
                home,
                &self.plan.home_exclude,
                StorageCategory::Other,
                categorise_file_name,
                &mut tasks,
                &mut totals,
            );
        }

        debug!("Measuring {} category locations", tasks.len());
        let measured: Vec<(StorageCategory, u64)> = self.pool.install(|| {
            tasks
                .par_iter()
                .map(|(path, cat)| (*cat, self.probe.measure_tree(path)))
                .collect()
        });
        // Summation happens only after every measurement has joined.
        for (cat, size) in measured {
            *totals.entry(cat).or_insert(0) += size;
        }
        totals
    }

    /// List `dir` one level deep: files are sized immediately and
    /// classified by `classify_file`; subdirectories become measurement
    /// tasks under `folder_category`.
    fn collect_shallow(
        &self,
        dir: &Path,
        exclude: &[String],
        folder_category: StorageCategory,
        classify_file: impl Fn(&str) -> StorageCategory,
        tasks: &mut Vec<(PathBuf, StorageCategory)>,
        totals: &mut BTreeMap<StorageCategory, u64>,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Cannot list {}: {err}", dir.display());
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if exclude.iter().any(|e| e == name.as_ref())
                || self.skip_names.iter().any(|s| s == name.as_ref())
            {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if meta.is_dir() {
                tasks.push((entry.path(), folder_category));
            } else {
                *totals.entry(classify_file(&name)).or_insert(0) += physical_size(&meta);
            }
        }
    }
}

/// Attribute the gap between `used` and the categorized total.
///
/// Up to `os_cap` bytes of the gap become the operating-system bucket; the
/// rest is merged into system data. The result is sorted by size
/// descending and, when the gap is non-negative, sums exactly to `used`.
pub fn reconcile(mut buckets: Vec<CategoryBucket>, used: u64, os_cap: u64) -> Vec<CategoryBucket> {
    let categorized: u64 = buckets.iter().map(|b| b.size_bytes).sum();
    let gap = used.saturating_sub(categorized);
    let os_share = gap.min(os_cap);
    let system_share = gap - os_share;

    if os_share > 0 {
        buckets.push(CategoryBucket::new(StorageCategory::OperatingSystem, os_share));
    }
    if system_share > 0 {
        match buckets
            .iter_mut()
            .find(|b| b.category == StorageCategory::SystemData)
        {
            Some(bucket) => bucket.size_bytes += system_share,
            None => buckets.push(CategoryBucket::new(StorageCategory::SystemData, system_share)),
        }
    }

    buckets.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then(a.category.cmp(&b.category))
    });
    buckets
}
