//! Notifications attached to campaigns.
//!
//! Events are fire-and-forget: recorders never block and never fail the
//! pass. Nothing in the reconciler reads them back.

use std::fmt;

use chaos_core::{ChaosEngine, ObjectKey};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Why an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventReason {
    Initialized,
    Completed,
    Stopped,
    RestartInProgress,
    OperationFailed,
}

impl EventReason {
    /// Reason string as published.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "ChaosEngineInitialized",
            Self::Completed => "ChaosEngineCompleted",
            Self::Stopped => "ChaosEngineStopped",
            Self::RestartInProgress => "RestartInProgress",
            Self::OperationFailed => "ChaosResourcesOperationFailed",
        }
    }
}

impl fmt::Display for EventReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
}

/// A notification about a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub reason: EventReason,
    pub event_type: EventType,
    pub message: String,
}

impl EngineEvent {
    fn normal(reason: EventReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            event_type: EventType::Normal,
            message: message.into(),
        }
    }

    fn warning(reason: EventReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            event_type: EventType::Warning,
            message: message.into(),
        }
    }

    /// Guard installed; the runner is about to be launched.
    pub fn initialized(runner_name: &str) -> Self {
        Self::normal(
            EventReason::Initialized,
            format!("Identifying app under test & launching {runner_name}"),
        )
    }

    /// The runner finished.
    pub fn completed() -> Self {
        Self::normal(
            EventReason::Completed,
            "ChaosEngine completed, will delete or retain the resources according to jobCleanUpPolicy",
        )
    }

    /// Child workloads were found and removed.
    pub fn stopped() -> Self {
        Self::normal(EventReason::Stopped, "Chaos resources deleted successfully")
    }

    /// Stopped with nothing to remove, usually because the target was
    /// never identified.
    pub fn stopped_without_resources() -> Self {
        Self::warning(
            EventReason::Stopped,
            "Chaos stopped due to failed app identification",
        )
    }

    /// A restart after abort began.
    pub fn restarting() -> Self {
        Self::normal(EventReason::RestartInProgress, "ChaosEngine is restarted")
    }

    /// An operation on chaos resources failed.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::warning(EventReason::OperationFailed, message)
    }
}

/// The campaign an event is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: ObjectKey,
    pub uid: String,
}

impl ObjectRef {
    /// Reference a campaign.
    pub fn of(engine: &ChaosEngine) -> Self {
        Self {
            key: engine.key(),
            uid: engine.correlation_id().to_string(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Sink for campaign events.
pub trait EventRecorder: Send + Sync {
    /// Record an event. Must not block.
    fn record(&self, object: &ObjectRef, event: EngineEvent);
}

/// Recorder that writes events to the log.
#[derive(Debug, Clone)]
pub struct TracingEventRecorder {
    source: String,
}

impl TracingEventRecorder {
    /// Create a recorder publishing as `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl EventRecorder for TracingEventRecorder {
    fn record(&self, object: &ObjectRef, event: EngineEvent) {
        match event.event_type {
            EventType::Normal => tracing::info!(
                source = %self.source,
                object = %object,
                reason = %event.reason,
                message = %event.message,
                "Event"
            ),
            EventType::Warning => tracing::warn!(
                source = %self.source,
                object = %object,
                reason = %event.reason,
                message = %event.message,
                "Event"
            ),
        }
    }
}

/// An event as delivered by [`ChannelEventRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub source: String,
    pub object: ObjectRef,
    pub event: EngineEvent,
}

/// Recorder that forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEventRecorder {
    source: String,
    sender: mpsc::UnboundedSender<RecordedEvent>,
}

impl ChannelEventRecorder {
    /// Create a recorder and the receiving end of its channel.
    pub fn new(source: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<RecordedEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                source: source.into(),
                sender,
            },
            receiver,
        )
    }
}

impl EventRecorder for ChannelEventRecorder {
    fn record(&self, object: &ObjectRef, event: EngineEvent) {
        let recorded = RecordedEvent {
            source: self.source.clone(),
            object: object.clone(),
            event,
        };
        if self.sender.send(recorded).is_err() {
            tracing::debug!(object = %object, "Event receiver dropped, discarding event");
        }
    }
}

/// Everything currently queued on a receiver.
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<RecordedEvent>) -> Vec<RecordedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
