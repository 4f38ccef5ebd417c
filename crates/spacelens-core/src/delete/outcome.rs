/// Result of a deletion attempt.
use std::path::PathBuf;

use serde::Serialize;

/// How much of a deletion succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    /// Nothing was left behind.
    Complete,
    /// Some entries were removed, the listed ones remain.
    Partial,
    /// Nothing could be removed.
    FullDenial,
}

/// Counts removed filesystem entries (the target and every descendant)
/// and lists every entry that still exists afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionOutcome {
    pub deleted_count: u64,
    pub skipped_paths: Vec<PathBuf>,
}

impl DeletionOutcome {
    pub fn complete(deleted_count: u64) -> Self {
        Self {
            deleted_count,
            skipped_paths: Vec::new(),
        }
    }

    pub fn full_denial(target: PathBuf) -> Self {
        Self {
            deleted_count: 0,
            skipped_paths: vec![target],
        }
    }

    /// Outcome of a walk that started with `census` entries and left
    /// `remaining` behind.
    pub fn from_remaining(census: u64, remaining: Vec<PathBuf>) -> Self {
        Self {
            deleted_count: census.saturating_sub(remaining.len() as u64),
            skipped_paths: remaining,
        }
    }

    pub fn status(&self) -> DeletionStatus {
        if self.skipped_paths.is_empty() {
            DeletionStatus::Complete
        } else if self.deleted_count == 0 {
            DeletionStatus::FullDenial
        } else {
            DeletionStatus::Partial
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_counts() {
        assert_eq!(DeletionOutcome::complete(3).status(), DeletionStatus::Complete);
        assert_eq!(
            DeletionOutcome::full_denial("/x".into()).status(),
            DeletionStatus::FullDenial
        );
        let partial = DeletionOutcome::from_remaining(5, vec!["/x".into(), "/x/y".into()]);
        assert_eq!(partial.deleted_count, 3);
        assert_eq!(partial.status(), DeletionStatus::Partial);
    }

    #[test]
    fn remaining_never_underflows() {
        let outcome = DeletionOutcome::from_remaining(1, vec!["/a".into(), "/b".into()]);
        assert_eq!(outcome.deleted_count, 0);
        assert_eq!(outcome.status(), DeletionStatus::FullDenial);
    }
}
