//! Reconciliation state machine for chaos experiment campaigns.
//!
//! Each call to [`Reconciler::reconcile`] is one pass over one campaign:
//!
//! 1. Load the campaign; a missing campaign is a no-op.
//! 2. A campaign being deleted always takes the teardown path.
//! 3. Defaults are applied, and a freshly initialized campaign gets its
//!    deletion guard in a pass of its own.
//! 4. The `(desired state, phase)` pair picks one [`Handler`].
//!
//! # Handlers
//!
//! - `Provision` - identify the target, launch the runner, detect completion
//! - `CompleteStop` - policy-gated cleanup after natural completion
//! - `ForceStop` / `Delete` - forced teardown, convergence wait, result
//!   sync and guard removal
//! - `RestartAfterAbort` / `RestartAfterComplete` - reset for a fresh run
//!
//! Every collaborator sits behind a trait: [`chaos_store::ObjectStore`],
//! [`EventRecorder`], [`AnnotationValidator`], [`RunnerSpecBuilder`],
//! [`chaos_store::CrdDiscovery`] and [`EnvSource`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chaos_core::ObjectKey;
//! use chaos_reconciler::Reconciler;
//! use chaos_store::InMemoryObjectStore;
//!
//! #[tokio::main]
//! async fn main() -> chaos_reconciler::Result<()> {
//!     let reconciler = Reconciler::builder()
//!         .with_store(InMemoryObjectStore::new_arc())
//!         .build()?;
//!
//!     let outcome = reconciler
//!         .reconcile(&ObjectKey::new("litmus", "engine"))
//!         .await?;
//!     if let Some(after) = outcome.requeue_after {
//!         // hand the key back to the work queue
//!     }
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod guard;
pub mod provision;
pub mod reconciler;
pub mod restart;
pub mod runner;
pub mod status_sync;
pub mod teardown;
pub mod types;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use config::{
    EnvSource, OperatorEnv, ProcessEnv, ReconcilerConfig, StaticEnv, DEFAULT_RUNNER_IMAGE,
};
pub use dispatch::{dispatch, resolve, Handler};
pub use error::{Error, Result};
pub use events::{
    ChannelEventRecorder, EngineEvent, EventReason, EventRecorder, EventType, ObjectRef,
    RecordedEvent, TracingEventRecorder,
};
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use runner::{DefaultRunnerBuilder, RunnerRequest, RunnerSpecBuilder};
pub use status_sync::merge_outcomes;
pub use types::{PassContext, ReconcileOutcome};
pub use validator::{
    AcceptAllValidator, AnnotationValidator, ApplicationInfo, StaticAnnotationValidator,
};
