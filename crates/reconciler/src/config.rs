//! Reconciler configuration.
//!
//! Two layers: [`ReconcilerConfig`] holds the tuning fixed at build time,
//! and [`OperatorEnv`] holds the deployment settings read from the
//! environment at the start of every pass, so changes apply without a
//! restart.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Runner image used when neither the campaign nor the environment names one.
pub const DEFAULT_RUNNER_IMAGE: &str = "litmuschaos/chaos-runner:latest";

/// Environment variable naming the fallback runner image.
pub const RUNNER_IMAGE_VAR: &str = "CHAOS_RUNNER_IMAGE";

/// Environment variable restricting the operator to one namespace.
pub const WATCH_NAMESPACE_VAR: &str = "WATCH_NAMESPACE";

/// Environment variable carrying the anonymous client id passed to runners.
pub const CLIENT_UUID_VAR: &str = "CLIENT_UUID";

/// Configuration for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Pod listings the convergence wait makes before giving up.
    pub convergence_attempts: u32,
    /// Pause between convergence listings.
    pub convergence_interval: Duration,
    /// Requeue delay after a pass that only installed the deletion guard.
    pub init_requeue_interval: Duration,
    /// Component name attached to emitted events.
    pub event_source: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            convergence_attempts: 180,
            convergence_interval: Duration::from_secs(1),
            init_requeue_interval: Duration::from_millis(100),
            event_source: "chaos-operator".to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// Set the number of convergence attempts.
    #[must_use]
    pub const fn with_convergence_attempts(mut self, attempts: u32) -> Self {
        self.convergence_attempts = attempts;
        self
    }

    /// Set the pause between convergence attempts.
    #[must_use]
    pub const fn with_convergence_interval(mut self, interval: Duration) -> Self {
        self.convergence_interval = interval;
        self
    }

    /// Set the requeue delay after guard installation.
    #[must_use]
    pub const fn with_init_requeue_interval(mut self, interval: Duration) -> Self {
        self.init_requeue_interval = interval;
        self
    }

    /// Set the event source name.
    #[must_use]
    pub fn with_event_source(mut self, source: impl Into<String>) -> Self {
        self.event_source = source.into();
        self
    }

    /// Settings suited to tests: a short convergence wait.
    #[must_use]
    pub fn fast() -> Self {
        Self::default()
            .with_convergence_attempts(5)
            .with_convergence_interval(Duration::from_millis(1))
            .with_init_requeue_interval(Duration::from_millis(1))
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no convergence attempt would be
    /// made or the event source is blank.
    pub fn validate(&self) -> Result<()> {
        if self.convergence_attempts == 0 {
            return Err(Error::invalid_config(
                "convergence_attempts must be at least 1",
            ));
        }
        if self.event_source.trim().is_empty() {
            return Err(Error::invalid_config("event_source must not be empty"));
        }
        Ok(())
    }
}

/// Source of environment variables.
pub trait EnvSource: Send + Sync {
    /// Value of a variable, `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    vars: BTreeMap<String, String>,
}

impl StaticEnv {
    /// No variables set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for StaticEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Deployment settings read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorEnv {
    /// Fallback runner image, `None` when unset or empty.
    pub runner_image: Option<String>,
    /// Namespace the operator is restricted to, `None` when cluster-scoped.
    pub watch_namespace: Option<String>,
    /// Client id forwarded to runners.
    pub client_uuid: String,
}

impl OperatorEnv {
    /// Read the settings from `env`. Empty values count as unset.
    pub fn load(env: &dyn EnvSource) -> Self {
        let non_empty = |name: &str| env.var(name).filter(|v| !v.trim().is_empty());
        Self {
            runner_image: non_empty(RUNNER_IMAGE_VAR),
            watch_namespace: non_empty(WATCH_NAMESPACE_VAR),
            client_uuid: env.var(CLIENT_UUID_VAR).unwrap_or_default(),
        }
    }

    /// Whether the operator watches every namespace.
    pub const fn is_cluster_scoped(&self) -> bool {
        self.watch_namespace.is_none()
    }

    /// Runner image to use: the campaign's own, else the environment's,
    /// else [`DEFAULT_RUNNER_IMAGE`].
    pub fn runner_image_for(&self, declared: &str) -> String {
        if !declared.is_empty() {
            return declared.to_string();
        }
        self.runner_image
            .clone()
            .unwrap_or_else(|| DEFAULT_RUNNER_IMAGE.to_string())
    }
}
