//! Store error types.

use std::path::PathBuf;
use std::time::Duration;

use mdreg_common::ValidationError;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by the record store, the catalog and the workflow.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("managed domain '{0}' already exists")]
    AlreadyExists(String),

    #[error("domain '{domain}' is already managed by '{owner}'")]
    Conflict { domain: String, owner: String },

    #[error("managed domain '{0}' not found")]
    NotFound(String),

    #[error("store lock {path:?} not acquired within {timeout:?}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("corrupt record for '{name}': {reason}")]
    Corrupt { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error classification for callers that map errors to statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    LockTimeout,
    Corruption,
    Internal,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::AlreadyExists(_) | StoreError::Conflict { .. } => ErrorKind::Conflict,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::LockTimeout { .. } => ErrorKind::LockTimeout,
            StoreError::Corrupt { .. } => ErrorKind::Corruption,
            StoreError::Io(_) | StoreError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same call may succeed if simply retried.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::LockTimeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            StoreError::from(ValidationError::EmptyDomainList).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            StoreError::AlreadyExists("a.example".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            StoreError::NotFound("a.example".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            StoreError::Corrupt {
                name: "a.example".into(),
                reason: "eof".into()
            }
            .kind(),
            ErrorKind::Corruption
        );
    }

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        let timeout = StoreError::LockTimeout {
            path: PathBuf::from("/tmp/store.lock"),
            timeout: Duration::from_millis(10),
        };
        assert!(timeout.is_retryable());
        assert!(!StoreError::NotFound("a.example".into()).is_retryable());
    }
}
