/// Analysis modules — storage categorisation and cleanup insights.

pub mod categories;
pub mod clean_targets;
pub mod file_types;

pub use categories::{reconcile, CategoryBucket, CategoryPlan, Categorizer};
pub use clean_targets::{clean_targets, CleanTarget};
pub use file_types::{categorise_extension, categorise_file_name, StorageCategory};
