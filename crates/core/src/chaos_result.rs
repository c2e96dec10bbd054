//! Companion result resource and its outcome annotations.
//!
//! External runners report per-target outcomes by writing annotations on
//! the result keyed `"<kind>/<name>"`. The reconciler consumes them into
//! the persistent target history.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meta::ObjectMeta;

/// Recognised outcome reported for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOutcome {
    Injected,
    Reverted,
    Targeted,
}

impl TargetOutcome {
    /// Recognise an annotation value, ignoring case. Anything else is not
    /// an outcome report.
    pub fn recognise(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "injected" => Some(Self::Injected),
            "reverted" => Some(Self::Reverted),
            "targeted" => Some(Self::Targeted),
            _ => None,
        }
    }

    /// Canonical lowercase form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Injected => "injected",
            Self::Reverted => "reverted",
            Self::Targeted => "targeted",
        }
    }
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an outcome annotation key of the form `"<kind>/<name>"`.
/// Both parts are trimmed; keys without a separator yield `None`.
pub fn parse_target_key(key: &str) -> Option<(&str, &str)> {
    let (kind, rest) = key.split_once('/')?;
    let name = rest.split('/').next().unwrap_or(rest);
    Some((kind.trim(), name.trim()))
}

/// One target in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDetails {
    pub name: String,
    pub kind: String,
    pub chaos_status: String,
}

/// History of targets touched by the campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetDetails>,
}

/// Result status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStatus {
    #[serde(default)]
    pub history: History,
}

/// The companion result resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosResult {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ResultStatus,
}

impl ChaosResult {
    /// Create an empty result.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            status: ResultStatus::default(),
        }
    }

    /// Target history entry by name.
    pub fn target(&self, name: &str) -> Option<&TargetDetails> {
        self.status.history.targets.iter().find(|t| t.name == name)
    }

    /// Record a status for a target: update the existing entry by name or
    /// append a new one.
    pub fn record_target(&mut self, kind: &str, name: &str, chaos_status: &str) {
        match self
            .status
            .history
            .targets
            .iter_mut()
            .find(|t| t.name == name)
        {
            Some(existing) => existing.chaos_status = chaos_status.to_string(),
            None => self.status.history.targets.push(TargetDetails {
                name: name.to_string(),
                kind: kind.to_string(),
                chaos_status: chaos_status.to_string(),
            }),
        }
    }
}
