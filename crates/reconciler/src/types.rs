//! Core types for the reconciler.

use std::time::Duration;

use chaos_core::LabelSelector;
use chaos_store::{CrdDiscovery, ObjectStore};

use crate::config::{OperatorEnv, ReconcilerConfig};
use crate::dispatch::Handler;
use crate::events::{EngineEvent, EventRecorder, ObjectRef};
use crate::runner::RunnerSpecBuilder;
use crate::validator::AnnotationValidator;

/// What a pass did, and whether the key should come back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Handler that ran, `None` when there was nothing to do.
    pub handler: Option<Handler>,
    /// Redeliver the key after this delay.
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    /// Nothing to do: the campaign is gone or already converged.
    pub const fn noop() -> Self {
        Self {
            handler: None,
            requeue_after: None,
        }
    }

    /// A handler ran to completion.
    pub const fn done(handler: Handler) -> Self {
        Self {
            handler: Some(handler),
            requeue_after: None,
        }
    }

    /// Ask for redelivery after `after`.
    pub const fn requeue(handler: Option<Handler>, after: Duration) -> Self {
        Self {
            handler,
            requeue_after: Some(after),
        }
    }

    /// Whether the key can be dropped from the queue.
    pub const fn is_settled(&self) -> bool {
        self.requeue_after.is_none()
    }
}

/// Collaborators and identity for one pass, handed to every handler.
pub struct PassContext<'a> {
    pub store: &'a dyn ObjectStore,
    pub events: &'a dyn EventRecorder,
    pub validator: &'a dyn AnnotationValidator,
    pub runner_builder: &'a dyn RunnerSpecBuilder,
    pub discovery: &'a dyn CrdDiscovery,
    pub config: &'a ReconcilerConfig,
    /// Environment as read at the start of the pass.
    pub env: OperatorEnv,
    /// The campaign being reconciled.
    pub campaign: ObjectRef,
}

impl PassContext<'_> {
    /// Attach an event to the campaign.
    pub fn emit(&self, event: EngineEvent) {
        self.events.record(&self.campaign, event);
    }

    /// Namespace of the campaign and all of its children.
    pub fn namespace(&self) -> &str {
        &self.campaign.key.namespace
    }

    /// Selector matching every child of the campaign.
    pub fn correlated(&self) -> LabelSelector {
        LabelSelector::correlated(self.campaign.uid.clone())
    }
}
