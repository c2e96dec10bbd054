//! Error types for the store crate.

use chaos_core::{ObjectKey, ObjectKind};
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Object store error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Object does not exist.
    #[error("{kind} '{key}' not found")]
    NotFound { kind: ObjectKind, key: ObjectKey },

    /// Object already exists.
    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: ObjectKind, key: ObjectKey },

    /// Optimistic concurrency check failed.
    #[error("conflict writing {kind} '{key}': expected resource version {expected}, found {actual}")]
    Conflict {
        kind: ObjectKind,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    /// Backend failure.
    #[error("store operation '{operation}' failed: {reason}")]
    Backend { operation: String, reason: String },

    /// Object could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(kind: ObjectKind, key: &ObjectKey) -> Self {
        Self::NotFound {
            kind,
            key: key.clone(),
        }
    }

    /// Create an already exists error.
    pub fn already_exists(kind: ObjectKind, key: &ObjectKey) -> Self {
        Self::AlreadyExists {
            kind,
            key: key.clone(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(kind: ObjectKind, key: &ObjectKey, expected: u64, actual: u64) -> Self {
        Self::Conflict {
            kind,
            key: key.clone(),
            expected,
            actual,
        }
    }

    /// Create a backend error.
    pub fn backend(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Whether the object was missing.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the object already existed.
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether an optimistic concurrency check failed.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<chaos_core::Error> for StoreError {
    fn from(err: chaos_core::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
