//! Options for delete operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How dependents of a deleted object are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropagationPolicy {
    /// Dependents are deleted before the owner disappears.
    Foreground,
    /// The owner disappears immediately; dependents are collected later.
    Background,
    /// Dependents are left behind.
    Orphan,
}

impl fmt::Display for PropagationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Foreground => "Foreground",
            Self::Background => "Background",
            Self::Orphan => "Orphan",
        };
        write!(f, "{s}")
    }
}

/// Options for `delete` and `delete_all_of`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// `None` leaves the choice to the store.
    pub propagation_policy: Option<PropagationPolicy>,
    /// `None` uses each object's own grace period.
    pub grace_period_seconds: Option<i64>,
}

impl DeleteOptions {
    /// Background propagation, default grace period.
    pub const fn background() -> Self {
        Self {
            propagation_policy: Some(PropagationPolicy::Background),
            grace_period_seconds: None,
        }
    }

    /// Override the grace period.
    #[must_use]
    pub const fn with_grace_period(mut self, seconds: Option<i64>) -> Self {
        self.grace_period_seconds = seconds;
        self
    }
}
