//! Object identity, metadata and label selection.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label carrying the owning campaign's correlation id on every child.
pub const CORRELATION_LABEL: &str = "chaosUID";

/// Label carrying the owning campaign's simple name.
pub const APP_LABEL: &str = "app";

/// Kinds of object the reconciler reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// The campaign resource.
    ChaosEngine,
    /// Companion result resource.
    ChaosResult,
    /// Pod-like child workload.
    Pod,
    /// Job-like child workload.
    Job,
}

impl ObjectKind {
    /// Plural display name, as used in operator notifications.
    pub const fn plural(self) -> &'static str {
        match self {
            Self::ChaosEngine => "ChaosEngines",
            Self::ChaosResult => "ChaosResults",
            Self::Pod => "Pods",
            Self::Job => "Jobs",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ChaosEngine => "ChaosEngine",
            Self::ChaosResult => "ChaosResult",
            Self::Pod => "Pod",
            Self::Job => "Job",
        };
        write!(f, "{s}")
    }
}

/// Namespaced name of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Create a new object key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Standard object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Unique identity assigned by the store. Used as the correlation id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub resource_version: u64,
}

impl ObjectMeta {
    /// Create metadata for a named object.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Set a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Key addressing this object.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Whether deletion has been requested.
    pub const fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

/// Equality-based label selector. An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Create a selector matching everything.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Selector scoped to one campaign's correlation id.
    pub fn correlated(uid: impl Into<String>) -> Self {
        Self::everything().with(CORRELATION_LABEL, uid)
    }

    /// Require an additional label.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    /// Whether the given labels satisfy the selector.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_subset() {
        let labels = ObjectMeta::new("ns", "p")
            .with_label(CORRELATION_LABEL, "uid-a")
            .with_label(APP_LABEL, "engine")
            .labels;

        assert!(LabelSelector::correlated("uid-a").matches(&labels));
        assert!(
            LabelSelector::correlated("uid-a")
                .with(APP_LABEL, "engine")
                .matches(&labels)
        );
        assert!(!LabelSelector::correlated("uid-b").matches(&labels));
        assert!(LabelSelector::everything().matches(&labels));
    }

    #[test]
    fn test_selector_missing_label_does_not_match() {
        let labels = ObjectMeta::new("ns", "p").with_label(APP_LABEL, "engine").labels;
        assert!(!LabelSelector::correlated("uid-a").matches(&labels));
    }

    #[test]
    fn test_selector_display() {
        let sel = LabelSelector::correlated("abc").with(APP_LABEL, "engine");
        assert_eq!(sel.to_string(), "app=engine,chaosUID=abc");
    }

    #[test]
    fn test_empty_collections_are_not_serialized() {
        let json = serde_json::to_value(ObjectMeta::new("ns", "engine"));
        assert!(json.is_ok());
        let json = json.unwrap_or_default();
        assert!(json.get("finalizers").is_none());
        assert!(json.get("labels").is_none());
        assert!(json.get("deletionTimestamp").is_none());
    }
}
