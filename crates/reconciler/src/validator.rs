//! Target eligibility seam.
//!
//! Whether the declared application may be targeted is decided outside
//! the reconciler; it only needs a yes (with details) or an error.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chaos_core::{AnnotationCheck, TargetSelector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Annotation an application carries to opt in to chaos.
pub const CHAOS_ANNOTATION_KEY: &str = "litmuschaos.io/chaos";

/// Application resolved from a target selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub label: String,
    pub namespace: String,
    pub kind: String,
}

impl From<&TargetSelector> for ApplicationInfo {
    fn from(selector: &TargetSelector) -> Self {
        Self {
            label: selector.label.clone(),
            namespace: selector.namespace.clone(),
            kind: selector.kind.clone(),
        }
    }
}

/// Decides whether a target application is eligible for chaos.
#[async_trait]
pub trait AnnotationValidator: Send + Sync {
    /// Validate the (namespace-resolved) selector under `check`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetIdentification`] when no eligible
    /// application matches.
    async fn validate(
        &self,
        selector: &TargetSelector,
        check: AnnotationCheck,
    ) -> Result<ApplicationInfo>;
}

/// Validator that accepts every selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

#[async_trait]
impl AnnotationValidator for AcceptAllValidator {
    async fn validate(
        &self,
        selector: &TargetSelector,
        _check: AnnotationCheck,
    ) -> Result<ApplicationInfo> {
        Ok(ApplicationInfo::from(selector))
    }
}

/// Validator backed by a fixed set of annotated applications, keyed by
/// namespace, label and kind.
#[derive(Debug, Clone, Default)]
pub struct StaticAnnotationValidator {
    annotated: BTreeSet<(String, String, String)>,
}

impl StaticAnnotationValidator {
    /// No application annotated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an application as annotated for chaos.
    #[must_use]
    pub fn with_annotated(
        mut self,
        namespace: impl Into<String>,
        label: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        self.annotated
            .insert((namespace.into(), label.into(), kind.into()));
        self
    }
}

#[async_trait]
impl AnnotationValidator for StaticAnnotationValidator {
    async fn validate(
        &self,
        selector: &TargetSelector,
        check: AnnotationCheck,
    ) -> Result<ApplicationInfo> {
        if check == AnnotationCheck::Disabled {
            return Ok(ApplicationInfo::from(selector));
        }
        let key = (
            selector.namespace.clone(),
            selector.label.clone(),
            selector.kind.clone(),
        );
        if self.annotated.contains(&key) {
            Ok(ApplicationInfo::from(selector))
        } else {
            Err(Error::target_identification(format!(
                "no {} with label '{}' in namespace '{}' is annotated with {CHAOS_ANNOTATION_KEY}=true",
                selector.kind, selector.label, selector.namespace
            )))
        }
    }
}
