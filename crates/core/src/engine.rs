//! The campaign resource (`ChaosEngine`) and its closed enumerations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::meta::{ObjectKey, ObjectMeta};

/// Deletion guard token owned by the reconciler.
pub const GUARD_FINALIZER: &str = "chaosengine.litmuschaos.io/finalizer";

/// Verdict recorded on experiments aborted by a stop.
pub const STOPPED_VERDICT: &str = "Stopped";

/// User intent for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DesiredState {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "stop")]
    Stopped,
}

impl DesiredState {
    /// All values, for exhaustive iteration.
    pub const ALL: [Self; 2] = [Self::Active, Self::Stopped];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Stopped => "stop",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DesiredState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "stop" => Ok(Self::Stopped),
            other => Err(Error::invalid_value("engineState", other, "active or stop")),
        }
    }
}

/// Controller-owned lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePhase {
    Initialized,
    Running,
    Completed,
    Stopped,
}

impl EnginePhase {
    /// All values, for exhaustive iteration.
    pub const ALL: [Self; 4] = [Self::Initialized, Self::Running, Self::Completed, Self::Stopped];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnginePhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initialized" => Ok(Self::Initialized),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "stopped" => Ok(Self::Stopped),
            other => Err(Error::invalid_value(
                "engineStatus",
                other,
                "initialized, running, completed or stopped",
            )),
        }
    }
}

/// Whether successfully-run child resources are removed after completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    Delete,
    #[default]
    Retain,
}

/// Decoded form of the string-typed `annotationCheck` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationCheck {
    /// Targets must opt in to chaos explicitly.
    Enabled,
    /// Targets are taken as declared.
    Disabled,
}

impl AnnotationCheck {
    /// Value assumed when the field is empty.
    pub const DEFAULT: &'static str = "true";

    /// Decode the raw flag. Empty means the default; only `"true"` and
    /// `"false"` are accepted otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for any other string.
    pub fn decode(raw: &str) -> Result<Self> {
        match raw {
            "" | "true" => Ok(Self::Enabled),
            "false" => Ok(Self::Disabled),
            other => Err(Error::invalid_value("annotationCheck", other, "true or false")),
        }
    }

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "true",
            Self::Disabled => "false",
        }
    }
}

impl fmt::Display for AnnotationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application the campaign targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelector {
    #[serde(rename = "applabel", default)]
    pub label: String,
    /// Empty means the campaign's own namespace.
    #[serde(rename = "appns", default)]
    pub namespace: String,
    #[serde(rename = "appkind", default)]
    pub kind: String,
}

impl TargetSelector {
    /// Create a selector.
    pub fn new(
        label: impl Into<String>,
        namespace: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            namespace: namespace.into(),
            kind: kind.into(),
        }
    }

    /// Copy of the selector with the namespace defaulted.
    #[must_use]
    pub fn resolved(&self, campaign_namespace: &str) -> Self {
        let namespace = if self.namespace.is_empty() {
            campaign_namespace.to_string()
        } else {
            self.namespace.clone()
        };
        Self {
            namespace,
            ..self.clone()
        }
    }

    /// Check that every field is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first empty field.
    pub fn ensure_complete(&self) -> Result<()> {
        [
            ("appinfo.applabel", &self.label),
            ("appinfo.appns", &self.namespace),
            ("appinfo.appkind", &self.kind),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map_or(Ok(()), |(field, _)| Err(Error::missing_field(field)))
    }
}

/// Reference to one experiment in the campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRef {
    pub name: String,
}

/// Source mounted into the runner (config map or secret).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountSource {
    pub name: String,
    pub mount_path: String,
}

/// Runner configuration carried on the campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerComponent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_pull_policy: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub runner_annotation: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_maps: Vec<MountSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<MountSource>,
}

/// Component configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub runner: RunnerComponent,
}

/// User-declared campaign spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_state: Option<DesiredState>,
    #[serde(default)]
    pub appinfo: TargetSelector,
    #[serde(default)]
    pub experiments: Vec<ExperimentRef>,
    #[serde(default)]
    pub job_clean_up_policy: CleanupPolicy,
    /// Raw `"true"`/`"false"` flag; decode with [`AnnotationCheck::decode`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub annotation_check: String,
    /// Zero means no override.
    #[serde(default)]
    pub termination_grace_period_seconds: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chaos_service_account: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auxiliary_app_info: String,
    #[serde(default)]
    pub components: Components,
}

/// Per-experiment execution state, as reported by the runner.
///
/// The runner owns this vocabulary, so values this controller does not
/// know are kept verbatim in [`ExperimentState::Other`] and treated as
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExperimentState {
    Waiting,
    Running,
    Completed,
    Aborted,
    Other(String),
}

impl ExperimentState {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "Waiting",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Aborted => "Aborted",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the experiment has not reached a terminal state.
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Waiting | Self::Running)
    }
}

impl From<String> for ExperimentState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Waiting" => Self::Waiting,
            "Running" => Self::Running,
            "Completed" => Self::Completed,
            "Aborted" => Self::Aborted,
            _ => Self::Other(raw),
        }
    }
}

impl From<ExperimentState> for String {
    fn from(state: ExperimentState) -> Self {
        match state {
            ExperimentState::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ExperimentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStatus {
    pub name: String,
    pub status: ExperimentState,
    #[serde(default)]
    pub verdict: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,
}

impl ExperimentStatus {
    /// Create a status entry with no verdict.
    pub fn new(name: impl Into<String>, status: ExperimentState) -> Self {
        Self {
            name: name.into(),
            status,
            verdict: String::new(),
            last_update_time: None,
        }
    }
}

/// Controller-owned campaign status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_status: Option<EnginePhase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<ExperimentStatus>,
}

/// The campaign resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosEngine {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: EngineSpec,
    #[serde(default)]
    pub status: EngineStatus,
}

impl ChaosEngine {
    /// Create an empty campaign.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Self::default()
        }
    }

    /// Append an experiment reference.
    #[must_use]
    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.spec.experiments.push(ExperimentRef { name: name.into() });
        self
    }

    /// Set the desired state.
    #[must_use]
    pub const fn with_desired_state(mut self, state: DesiredState) -> Self {
        self.spec.engine_state = Some(state);
        self
    }

    /// Set the observed phase.
    #[must_use]
    pub const fn with_phase(mut self, phase: EnginePhase) -> Self {
        self.status.engine_status = Some(phase);
        self
    }

    /// Set the target selector.
    #[must_use]
    pub fn with_target(mut self, target: TargetSelector) -> Self {
        self.spec.appinfo = target;
        self
    }

    /// Set the cleanup policy.
    #[must_use]
    pub const fn with_cleanup_policy(mut self, policy: CleanupPolicy) -> Self {
        self.spec.job_clean_up_policy = policy;
        self
    }

    /// Set the raw annotation check flag.
    #[must_use]
    pub fn with_annotation_check(mut self, raw: impl Into<String>) -> Self {
        self.spec.annotation_check = raw.into();
        self
    }

    /// Set the forced-deletion grace period override.
    #[must_use]
    pub const fn with_grace_period(mut self, seconds: i64) -> Self {
        self.spec.termination_grace_period_seconds = seconds;
        self
    }

    /// Key addressing this campaign.
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Campaign name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Campaign namespace.
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Correlation id labelling every child of this campaign.
    pub fn correlation_id(&self) -> &str {
        &self.metadata.uid
    }

    /// Desired state, defaulting to active.
    pub fn desired_state(&self) -> DesiredState {
        self.spec.engine_state.unwrap_or(DesiredState::Active)
    }

    /// Observed phase, `None` when never set.
    pub const fn phase(&self) -> Option<EnginePhase> {
        self.status.engine_status
    }

    /// Deterministic runner workload name.
    pub fn runner_name(&self) -> String {
        format!("{}-runner", self.metadata.name)
    }

    /// Experiment names in declaration order.
    pub fn experiment_names(&self) -> Vec<String> {
        self.spec.experiments.iter().map(|e| e.name.clone()).collect()
    }

    /// Fill in defaults: desired state active, and phase initialized when
    /// active and unset. Returns whether anything changed.
    pub fn apply_defaults(&mut self) -> bool {
        let mut changed = false;
        if self.spec.engine_state.is_none() {
            self.spec.engine_state = Some(DesiredState::Active);
            changed = true;
        }
        if self.spec.engine_state == Some(DesiredState::Active)
            && self.status.engine_status.is_none()
        {
            self.status.engine_status = Some(EnginePhase::Initialized);
            changed = true;
        }
        changed
    }

    /// Mark every waiting or running experiment aborted with the stopped
    /// verdict. Terminal entries are untouched. Returns how many changed.
    pub fn abort_in_flight_experiments(&mut self, now: DateTime<Utc>) -> usize {
        let mut aborted = 0;
        for experiment in self
            .status
            .experiments
            .iter_mut()
            .filter(|e| e.status.is_in_flight())
        {
            experiment.status = ExperimentState::Aborted;
            experiment.verdict = STOPPED_VERDICT.to_string();
            experiment.last_update_time = Some(now);
            aborted += 1;
        }
        aborted
    }

    /// Reset status for a fresh run.
    pub fn reset_for_restart(&mut self) {
        self.status.engine_status = Some(EnginePhase::Initialized);
        self.status.experiments.clear();
    }
}
