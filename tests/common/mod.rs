//! Shared harness for end-to-end campaign tests.

#![allow(dead_code)]

use std::sync::Arc;

use chaos_operator::chaos_core::{
    ChaosEngine, ContainerState, ContainerStatus, ExperimentState, ExperimentStatus, ObjectKey,
    Pod, PodPhase, TerminatedState, APP_LABEL, COMPLETED_REASON, CORRELATION_LABEL,
    GUARD_FINALIZER, RUNNER_CONTAINER,
};
use chaos_operator::chaos_reconciler::events::drain;
use chaos_operator::chaos_reconciler::{
    AcceptAllValidator, AnnotationValidator, ChannelEventRecorder, EventReason, RecordedEvent,
    Reconciler, ReconcilerConfig, StaticEnv,
};
use chaos_operator::chaos_store::{InMemoryObjectStore, ObjectStoreExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Install a test subscriber once. `RUST_LOG` overrides the default level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub store: Arc<InMemoryObjectStore>,
    pub reconciler: Reconciler,
    events: UnboundedReceiver<RecordedEvent>,
}

impl Harness {
    pub fn new() -> TestResult<Self> {
        Self::with_validator(Arc::new(AcceptAllValidator))
    }

    pub fn with_validator(validator: Arc<dyn AnnotationValidator>) -> TestResult<Self> {
        init_tracing();
        let store = InMemoryObjectStore::new_arc();
        let (recorder, events) = ChannelEventRecorder::new("chaos-operator");
        let reconciler = Reconciler::builder()
            .with_store(store.clone())
            .with_events(Arc::new(recorder))
            .with_validator(validator)
            .with_env(Arc::new(StaticEnv::new()))
            .with_config(ReconcilerConfig::fast())
            .build()?;
        Ok(Self {
            store,
            reconciler,
            events,
        })
    }

    pub fn events(&mut self) -> Vec<RecordedEvent> {
        drain(&mut self.events)
    }

    pub fn reasons(&mut self) -> Vec<EventReason> {
        self.events().into_iter().map(|e| e.event.reason).collect()
    }

    pub async fn engine(&self, key: &ObjectKey) -> TestResult<ChaosEngine> {
        Ok(self.store.fetch(key).await?)
    }

    /// Seed a pod correlated with `engine`.
    pub async fn child_pod(&self, engine: &ChaosEngine, name: &str) -> TestResult<Pod> {
        let mut pod = Pod::new(engine.namespace(), name);
        pod.metadata = pod
            .metadata
            .with_label(APP_LABEL, engine.name())
            .with_label(CORRELATION_LABEL, engine.correlation_id());
        Ok(self.store.insert(pod).await?)
    }

    /// Report the runner container as finished.
    pub async fn finish_runner(&self, engine: &ChaosEngine) -> TestResult {
        let key = ObjectKey::new(engine.namespace(), engine.runner_name());
        let mut runner: Pod = self.store.fetch(&key).await?;
        runner.status.phase = PodPhase::Running;
        runner.status.container_statuses = vec![ContainerStatus {
            name: RUNNER_CONTAINER.to_string(),
            ready: false,
            state: ContainerState {
                terminated: Some(TerminatedState {
                    reason: COMPLETED_REASON.to_string(),
                    exit_code: 0,
                }),
            },
        }];
        self.store.update_object(runner).await?;
        Ok(())
    }
}

/// A campaign that already carries the deletion guard.
pub fn guarded(mut engine: ChaosEngine) -> ChaosEngine {
    engine.metadata.finalizers.push(GUARD_FINALIZER.to_string());
    engine
}

/// One experiment in each of the waiting, running and completed states.
pub fn mixed_experiments(mut engine: ChaosEngine) -> ChaosEngine {
    engine.status.experiments = vec![
        ExperimentStatus::new("pod-delete", ExperimentState::Running),
        ExperimentStatus::new("cpu-hog", ExperimentState::Waiting),
        ExperimentStatus::new("network-loss", ExperimentState::Completed),
    ];
    engine
}
