//! Resource-definition discovery.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// Name of the result resource definition the reconciler needs when it
/// watches every namespace.
pub const RESULT_DEFINITION: &str = "chaosresults.litmuschaos.io";

/// Answers whether a resource definition is installed.
#[async_trait]
pub trait CrdDiscovery: Send + Sync {
    /// Whether the named definition (`<plural>.<group>`) exists.
    async fn crd_exists(&self, name: &str) -> Result<bool>;
}

/// Discovery backed by a fixed, editable set of names.
#[derive(Debug, Default)]
pub struct StaticCrdDiscovery {
    installed: RwLock<BTreeSet<String>>,
}

impl StaticCrdDiscovery {
    /// Nothing installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The result definition installed.
    pub fn with_result_definition() -> Self {
        Self::with_installed([RESULT_DEFINITION])
    }

    /// Start with the given definitions installed.
    pub fn with_installed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: RwLock::new(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Install a definition.
    pub async fn install(&self, name: impl Into<String>) {
        self.installed.write().await.insert(name.into());
    }

    /// Remove a definition.
    pub async fn uninstall(&self, name: &str) {
        self.installed.write().await.remove(name);
    }
}

#[async_trait]
impl CrdDiscovery for StaticCrdDiscovery {
    async fn crd_exists(&self, name: &str) -> Result<bool> {
        Ok(self.installed.read().await.contains(name))
    }
}
