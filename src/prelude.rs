//! Prelude module - common imports for driving campaigns
//!
//! ```rust
//! use chaos_operator::prelude::*;
//! ```

// Resource model
pub use chaos_core::{
    ChaosEngine, ChaosResult, CleanupPolicy, DesiredState, EnginePhase, ExperimentState,
    ExperimentStatus, Job, LabelSelector, ObjectKey, ObjectKind, Pod, TargetSelector,
    GUARD_FINALIZER,
};

// Store seam
pub use chaos_store::{
    CrdDiscovery, InMemoryObjectStore, ObjectStore, ObjectStoreExt, StaticCrdDiscovery,
    StoreError,
};

// Reconciler
pub use chaos_reconciler::{
    ChannelEventRecorder, EngineEvent, EventReason, EventRecorder, Handler, ReconcileOutcome,
    Reconciler, ReconcilerBuilder, ReconcilerConfig, StaticAnnotationValidator, StaticEnv,
};
