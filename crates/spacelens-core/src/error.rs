//! Error taxonomy for the spacelens engine.
//!
//! Only input errors and protected-path rejections reach callers as hard
//! failures. Permission problems inside a tree are absorbed by the size
//! probe's fallback tiers, and partial deletions are reported through
//! [`crate::delete::DeletionOutcome`] instead of an error.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the public engine API.
#[derive(Debug, Error)]
pub enum DiskError {
    /// The requested root does not exist.
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// The requested scan root exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The deletion target is on the critical-path deny-list.
    #[error("cannot delete critical system path: {}", .0.display())]
    ProtectedPath(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("filesystem watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("worker pool initialization failed: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DiskError {
    /// `true` for caller mistakes (missing or non-directory input) that
    /// must never be retried.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotADirectory(_))
    }
}

pub type Result<T> = std::result::Result<T, DiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(DiskError::NotFound(PathBuf::from("/nope")).is_input_error());
        assert!(DiskError::NotADirectory(PathBuf::from("/etc/hosts")).is_input_error());
        assert!(!DiskError::ProtectedPath(PathBuf::from("/")).is_input_error());
        assert!(!DiskError::Config("x".into()).is_input_error());
    }

    #[test]
    fn protected_path_message_names_the_path() {
        let err = DiskError::ProtectedPath(PathBuf::from("/System"));
        assert_eq!(err.to_string(), "cannot delete critical system path: /System");
    }
}
