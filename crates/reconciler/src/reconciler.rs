//! Reconciler implementation.

use std::sync::Arc;

use chaos_core::{ChaosEngine, EnginePhase, ObjectKey};
use chaos_store::{
    CrdDiscovery, ObjectStore, ObjectStoreExt, StaticCrdDiscovery, StoreResultExt,
    TracingObjectStore,
};
use tracing::{debug, field, info, info_span, warn, Instrument, Span};

use crate::config::{EnvSource, OperatorEnv, ProcessEnv, ReconcilerConfig};
use crate::dispatch::{resolve, Handler};
use crate::error::{Error, Result};
use crate::events::{EngineEvent, EventRecorder, ObjectRef, TracingEventRecorder};
use crate::guard::{add_guard, has_guard};
use crate::provision::provision;
use crate::restart::{after_abort, after_complete};
use crate::runner::{DefaultRunnerBuilder, RunnerSpecBuilder};
use crate::teardown::{complete_stop, delete_path};
use crate::types::{PassContext, ReconcileOutcome};
use crate::validator::{AcceptAllValidator, AnnotationValidator};

/// Drives one campaign per call towards its desired state.
///
/// Callers serialise passes per key and redeliver keys on error or when
/// the outcome asks for a requeue. Distinct keys may be reconciled
/// concurrently.
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    events: Arc<dyn EventRecorder>,
    validator: Arc<dyn AnnotationValidator>,
    runner_builder: Arc<dyn RunnerSpecBuilder>,
    discovery: Arc<dyn CrdDiscovery>,
    env: Arc<dyn EnvSource>,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Start building a reconciler.
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
    }

    /// Run one pass for the campaign at `key`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the pass. Nothing is rolled back; the
    /// next delivery picks up from whatever was persisted.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let span = info_span!(
            "reconcile",
            namespace = %key.namespace,
            name = %key.name,
            uid = field::Empty,
            handler = field::Empty,
        );
        async {
            let result = self.pass(key).await;
            if let Err(ref e) = result {
                warn!(error = %e, "Reconcile pass failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn pass(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let Some(mut engine) = self
            .store
            .fetch::<ChaosEngine>(key)
            .await
            .not_found_as_none()?
        else {
            debug!("ChaosEngine not found, nothing to do");
            return Ok(ReconcileOutcome::noop());
        };

        let span = Span::current();
        span.record("uid", engine.correlation_id());
        let ctx = self.context(&engine);

        if engine.metadata.is_deleting() {
            span.record("handler", Handler::Delete.as_str());
            delete_path(&ctx, engine).await?;
            return Ok(ReconcileOutcome::done(Handler::Delete));
        }

        engine.apply_defaults();
        if engine.phase() == Some(EnginePhase::Initialized) && !has_guard(&engine) {
            return self.install_guard(&ctx, engine).await;
        }

        let Some(handler) = resolve(&engine) else {
            debug!(
                desired = %engine.desired_state(),
                phase = ?engine.phase(),
                "No handler for current state"
            );
            return Ok(ReconcileOutcome::noop());
        };
        span.record("handler", handler.as_str());
        debug!("Dispatching");

        match handler {
            Handler::Provision => return provision(&ctx, engine).await,
            Handler::Delete | Handler::ForceStop => delete_path(&ctx, engine).await?,
            Handler::CompleteStop => complete_stop(&ctx, engine).await?,
            Handler::RestartAfterAbort => after_abort(&ctx, engine).await?,
            Handler::RestartAfterComplete => after_complete(&ctx, engine).await?,
        }
        Ok(ReconcileOutcome::done(handler))
    }

    /// Persist the guard together with the defaults and announce the run.
    /// Provisioning waits for the next delivery.
    async fn install_guard(
        &self,
        ctx: &PassContext<'_>,
        mut engine: ChaosEngine,
    ) -> Result<ReconcileOutcome> {
        add_guard(&mut engine);
        let runner = engine.runner_name();
        self.store.update_object(engine).await?;
        info!("Deletion guard installed");
        ctx.emit(EngineEvent::initialized(&runner));
        Ok(ReconcileOutcome::requeue(
            None,
            self.config.init_requeue_interval,
        ))
    }

    fn context(&self, engine: &ChaosEngine) -> PassContext<'_> {
        PassContext {
            store: self.store.as_ref(),
            events: self.events.as_ref(),
            validator: self.validator.as_ref(),
            runner_builder: self.runner_builder.as_ref(),
            discovery: self.discovery.as_ref(),
            config: &self.config,
            env: OperatorEnv::load(self.env.as_ref()),
            campaign: ObjectRef::of(engine),
        }
    }

    /// The store every pass reads and writes through.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for [`Reconciler`]. Only the store is required.
#[derive(Default)]
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn ObjectStore>>,
    events: Option<Arc<dyn EventRecorder>>,
    validator: Option<Arc<dyn AnnotationValidator>>,
    runner_builder: Option<Arc<dyn RunnerSpecBuilder>>,
    discovery: Option<Arc<dyn CrdDiscovery>>,
    env: Option<Arc<dyn EnvSource>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the event sink. Defaults to logging events.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventRecorder>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the annotation validator. Defaults to accepting every target.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn AnnotationValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Set the runner spec builder.
    #[must_use]
    pub fn with_runner_builder(mut self, runner_builder: Arc<dyn RunnerSpecBuilder>) -> Self {
        self.runner_builder = Some(runner_builder);
        self
    }

    /// Set definition discovery. Defaults to a registry holding only the
    /// result definition.
    #[must_use]
    pub fn with_discovery(mut self, discovery: Arc<dyn CrdDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Set the environment source. Defaults to the process environment.
    #[must_use]
    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = Some(env);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when no store was given or the
    /// configuration is invalid.
    pub fn build(self) -> Result<Reconciler> {
        self.config.validate()?;
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("object store is required"))?;
        let source = self.config.event_source.clone();

        Ok(Reconciler {
            store: Arc::new(TracingObjectStore::new(store)),
            events: self
                .events
                .unwrap_or_else(|| Arc::new(TracingEventRecorder::new(source))),
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(AcceptAllValidator)),
            runner_builder: self
                .runner_builder
                .unwrap_or_else(|| Arc::new(DefaultRunnerBuilder)),
            discovery: self
                .discovery
                .unwrap_or_else(|| Arc::new(StaticCrdDiscovery::with_result_definition())),
            env: self.env.unwrap_or_else(|| Arc::new(ProcessEnv)),
            config: self.config,
        })
    }
}
