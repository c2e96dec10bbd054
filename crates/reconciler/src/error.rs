//! Error types for the reconciler crate.

use chaos_core::ObjectKind;
use chaos_store::StoreError;
use itertools::Itertools;
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
///
/// Every variant is surfaced to the caller, which redelivers the key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Object store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A resource field failed to decode.
    #[error(transparent)]
    Model(#[from] chaos_core::Error),

    /// The campaign cannot run as declared.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The target application could not be identified.
    #[error("unable to identify target application: {reason}")]
    TargetIdentification { reason: String },

    /// Bulk deletion failed for at least one kind.
    #[error("unable to delete chaos resources: {}", plurals(.kinds))]
    PartialTeardown { kinds: Vec<ObjectKind> },

    /// Child pods were still listed after every attempt.
    #[error("chaos pods are not deleted yet: {remaining} remaining after {attempts} attempts")]
    ConvergenceTimeout { attempts: u32, remaining: usize },

    /// The runner workload could not be described.
    #[error("unable to build runner: {reason}")]
    RunnerBuild { reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

fn plurals(kinds: &[ObjectKind]) -> String {
    kinds.iter().map(|k| k.plural()).join(", ")
}

impl Error {
    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a target identification error.
    pub fn target_identification(reason: impl Into<String>) -> Self {
        Self::TargetIdentification {
            reason: reason.into(),
        }
    }

    /// Create a partial teardown error.
    pub const fn partial_teardown(kinds: Vec<ObjectKind>) -> Self {
        Self::PartialTeardown { kinds }
    }

    /// Create a convergence timeout error.
    pub const fn convergence_timeout(attempts: u32, remaining: usize) -> Self {
        Self::ConvergenceTimeout {
            attempts,
            remaining,
        }
    }

    /// Create a runner build error.
    pub fn runner_build(reason: impl Into<String>) -> Self {
        Self::RunnerBuild {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the store reported a stale write.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}
