//! Resource model for chaos experiment campaigns.
//!
//! - **Campaign** ([`ChaosEngine`]): desired state, observed phase, target
//!   selector, experiments, cleanup policy and deletion guard.
//! - **Companion result** ([`ChaosResult`]): per-target outcome history fed
//!   by annotations.
//! - **Child workloads** ([`Pod`], [`Job`]): always labelled with the
//!   campaign's correlation id.
//!
//! String-typed flags and enums decode strictly: unknown values are errors.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod chaos_result;
pub mod engine;
pub mod error;
pub mod meta;
pub mod object;
pub mod workload;

pub use chaos_result::{ChaosResult, History, ResultStatus, TargetDetails, TargetOutcome};
pub use engine::{
    AnnotationCheck, ChaosEngine, CleanupPolicy, Components, DesiredState, EnginePhase,
    EngineSpec, EngineStatus, ExperimentRef, ExperimentState, ExperimentStatus, MountSource,
    RunnerComponent, TargetSelector, GUARD_FINALIZER, STOPPED_VERDICT,
};
pub use error::{Error, Result};
pub use meta::{LabelSelector, ObjectKey, ObjectKind, ObjectMeta, APP_LABEL, CORRELATION_LABEL};
pub use object::{Object, Resource};
pub use workload::{
    Container, ContainerState, ContainerStatus, EnvVar, Job, Pod, PodPhase, PodSpec, PodStatus,
    TerminatedState, Volume, VolumeMount, VolumeSource, COMPLETED_REASON, RUNNER_CONTAINER,
};
