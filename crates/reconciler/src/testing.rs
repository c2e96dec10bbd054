//! Shared fixture for handler tests.

use std::sync::Arc;

use chaos_core::{
    ChaosEngine, ChaosResult, ContainerState, ContainerStatus, Pod, PodPhase, TerminatedState,
    APP_LABEL, COMPLETED_REASON, CORRELATION_LABEL, RUNNER_CONTAINER,
};
use chaos_store::{InMemoryObjectStore, StaticCrdDiscovery};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::{OperatorEnv, ReconcilerConfig};
use crate::error::Result;
use crate::events::{drain, ChannelEventRecorder, ObjectRef, RecordedEvent};
use crate::runner::DefaultRunnerBuilder;
use crate::types::PassContext;
use crate::validator::{AcceptAllValidator, AnnotationValidator};

pub struct Fixture {
    pub store: Arc<InMemoryObjectStore>,
    pub recorder: ChannelEventRecorder,
    pub receiver: UnboundedReceiver<RecordedEvent>,
    pub validator: Box<dyn AnnotationValidator>,
    pub runner_builder: DefaultRunnerBuilder,
    pub discovery: StaticCrdDiscovery,
    pub config: ReconcilerConfig,
    pub env: OperatorEnv,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_validator(AcceptAllValidator)
    }

    pub fn with_validator(validator: impl AnnotationValidator + 'static) -> Self {
        let (recorder, receiver) = ChannelEventRecorder::new("chaos-operator");
        Self {
            store: InMemoryObjectStore::new_arc(),
            recorder,
            receiver,
            validator: Box::new(validator),
            runner_builder: DefaultRunnerBuilder,
            discovery: StaticCrdDiscovery::with_result_definition(),
            config: ReconcilerConfig::fast(),
            env: OperatorEnv::default(),
        }
    }

    pub fn without_result_definition() -> Self {
        Self {
            discovery: StaticCrdDiscovery::new(),
            ..Self::new()
        }
    }

    pub fn ctx(&self, engine: &ChaosEngine) -> PassContext<'_> {
        PassContext {
            store: self.store.as_ref(),
            events: &self.recorder,
            validator: self.validator.as_ref(),
            runner_builder: &self.runner_builder,
            discovery: &self.discovery,
            config: &self.config,
            env: self.env.clone(),
            campaign: ObjectRef::of(engine),
        }
    }

    pub fn events(&mut self) -> Vec<RecordedEvent> {
        drain(&mut self.receiver)
    }

    pub async fn seed_engine(&self, engine: ChaosEngine) -> Result<ChaosEngine> {
        Ok(self.store.insert(engine).await?)
    }

    pub async fn seed_child_pod(&self, engine: &ChaosEngine, name: &str) -> Result<Pod> {
        let mut pod = Pod::new(engine.namespace(), name);
        pod.metadata = pod
            .metadata
            .with_label(APP_LABEL, engine.name())
            .with_label(CORRELATION_LABEL, engine.correlation_id());
        Ok(self.store.insert(pod).await?)
    }

    pub async fn seed_result(
        &self,
        engine: &ChaosEngine,
        annotations: &[(&str, &str)],
    ) -> Result<ChaosResult> {
        let mut result = ChaosResult::new(engine.namespace(), format!("{}-result", engine.name()));
        result.metadata = result
            .metadata
            .with_label(CORRELATION_LABEL, engine.correlation_id());
        for (key, value) in annotations {
            result.metadata = result.metadata.with_annotation(*key, *value);
        }
        Ok(self.store.insert(result).await?)
    }
}

/// A runner whose container exited cleanly.
pub fn completed_runner(engine: &ChaosEngine) -> Pod {
    let mut pod = Pod::new(engine.namespace(), engine.runner_name());
    pod.metadata = pod
        .metadata
        .with_label(APP_LABEL, engine.name())
        .with_label(CORRELATION_LABEL, engine.correlation_id());
    pod.status.phase = PodPhase::Succeeded;
    pod.status.container_statuses.push(ContainerStatus {
        name: RUNNER_CONTAINER.to_string(),
        ready: false,
        state: ContainerState {
            terminated: Some(TerminatedState {
                reason: COMPLETED_REASON.to_string(),
                exit_code: 0,
            }),
        },
    });
    pod
}
