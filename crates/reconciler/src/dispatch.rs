//! Phase resolution.
//!
//! Maps a campaign's (desired state, observed phase) pair to the single
//! handler that moves it forward. Resolution is pure; running the handler
//! is the reconciler's job.

use std::fmt;

use chaos_core::{ChaosEngine, DesiredState, EnginePhase};
use serde::{Deserialize, Serialize};

/// Handler chosen for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handler {
    /// The campaign is being deleted; tear everything down.
    Delete,
    /// Active and initialized: launch and watch the runner.
    Provision,
    /// Stopped after natural completion: policy-gated cleanup.
    CompleteStop,
    /// Stopped while initialized: forced teardown.
    ForceStop,
    /// Reactivated after an abort.
    RestartAfterAbort,
    /// Reactivated after completion.
    RestartAfterComplete,
}

impl Handler {
    /// Name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Provision => "provision",
            Self::CompleteStop => "complete-stop",
            Self::ForceStop => "force-stop",
            Self::RestartAfterAbort => "restart-after-abort",
            Self::RestartAfterComplete => "restart-after-complete",
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handler for an explicit (desired, phase) pair. First match wins;
/// `None` means nothing to do.
pub const fn dispatch(desired: DesiredState, phase: Option<EnginePhase>) -> Option<Handler> {
    match (desired, phase) {
        (DesiredState::Active, Some(EnginePhase::Initialized)) => Some(Handler::Provision),
        (DesiredState::Stopped, Some(EnginePhase::Completed)) => Some(Handler::CompleteStop),
        (DesiredState::Stopped, Some(EnginePhase::Initialized)) => Some(Handler::ForceStop),
        (DesiredState::Active, Some(EnginePhase::Stopped)) => Some(Handler::RestartAfterAbort),
        (DesiredState::Active, Some(EnginePhase::Completed)) => Some(Handler::RestartAfterComplete),
        _ => None,
    }
}

/// Handler for a loaded campaign. Deletion wins over every phase;
/// otherwise defaults are assumed (desired active, phase initialized when
/// active and unset) before consulting [`dispatch`].
pub fn resolve(engine: &ChaosEngine) -> Option<Handler> {
    if engine.metadata.is_deleting() {
        return Some(Handler::Delete);
    }
    let desired = engine.desired_state();
    let phase = match (desired, engine.phase()) {
        (DesiredState::Active, None) => Some(EnginePhase::Initialized),
        (_, phase) => phase,
    };
    dispatch(desired, phase)
}
