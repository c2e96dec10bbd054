//! Runner provisioning and completion detection.

use chaos_core::{AnnotationCheck, ChaosEngine, DesiredState, EnginePhase, ObjectKey, Pod};
use chaos_store::{ObjectStoreExt, StoreResultExt};
use tracing::{debug, info, warn};

use crate::dispatch::Handler;
use crate::error::{Error, Result};
use crate::events::EngineEvent;
use crate::runner::RunnerRequest;
use crate::types::{PassContext, ReconcileOutcome};
use crate::validator::ApplicationInfo;

/// What the runner lookup found.
#[derive(Debug)]
enum RunnerState {
    /// Created in this pass, or by a concurrent creator.
    Launched,
    /// Already running; its status can be judged.
    Existing(Pod),
    /// A previous run's runner is still being deleted.
    Terminating,
}

/// Launch the runner for an active, initialized campaign and watch it
/// finish.
///
/// A target that cannot be identified forces the campaign to `Stopped` so
/// it does not stay active forever, and the identification error is
/// returned. On the first pass that sees the runner finish, the phase
/// becomes `Completed` and the desired state `Stopped`. While a previous
/// run's runner is still terminating nothing is created or judged, and
/// the key is requeued.
///
/// # Errors
///
/// Returns the identification error, [`Error::Validation`] for an empty
/// experiment list, or the store error from ensuring the runner or
/// recording completion.
pub async fn provision(ctx: &PassContext<'_>, engine: ChaosEngine) -> Result<ReconcileOutcome> {
    let image = ctx
        .env
        .runner_image_for(&engine.spec.components.runner.image);

    match identify_target(ctx, &engine, &image).await {
        Ok(Some(app)) => debug!(?app, "Target application identified"),
        Ok(None) => debug!("Annotation check disabled"),
        Err(err) => return Err(stop_after_failed_identification(ctx, &engine, err).await),
    }

    if engine.spec.experiments.is_empty() {
        ctx.emit(EngineEvent::operation_failed(
            "(chaos start) Unable to get chaos resources",
        ));
        return Err(Error::validation("application experiment list is empty"));
    }

    let runner = match ensure_runner(ctx, &engine, &image).await {
        Ok(runner) => runner,
        Err(e) => {
            ctx.emit(EngineEvent::operation_failed(
                "(chaos start) Unable to get chaos resources",
            ));
            return Err(e);
        }
    };

    match runner {
        RunnerState::Terminating => {
            return Ok(ReconcileOutcome::requeue(
                Some(Handler::Provision),
                ctx.config.convergence_interval,
            ));
        }
        RunnerState::Existing(pod) if pod.runner_completed() => {
            mark_completed(ctx, engine).await?;
        }
        RunnerState::Existing(_) | RunnerState::Launched => {}
    }
    Ok(ReconcileOutcome::done(Handler::Provision))
}

/// Decode the annotation check and, when enabled, have the validator
/// confirm the target.
async fn identify_target(
    ctx: &PassContext<'_>,
    engine: &ChaosEngine,
    image: &str,
) -> Result<Option<ApplicationInfo>> {
    let check = AnnotationCheck::decode(&engine.spec.annotation_check)?;
    let target = engine.spec.appinfo.resolved(engine.namespace());

    info!(
        app_label = %target.label,
        app_namespace = %target.namespace,
        app_kind = %target.kind,
        experiments = ?engine.experiment_names(),
        runner_image = image,
        annotation_check = %check,
        "Application details derived from chaosengine"
    );

    if check == AnnotationCheck::Disabled {
        return Ok(None);
    }

    target.ensure_complete().map_err(|e| {
        Error::validation(format!("incomplete AppInfo inside chaosengine: {e}"))
    })?;

    match ctx.validator.validate(&target, check).await {
        Ok(info) => Ok(Some(info)),
        Err(e) => {
            ctx.emit(EngineEvent::operation_failed(
                "(app identification) Unable to filter app by specified info",
            ));
            warn!(error = %e, "Annotation check failed");
            Err(e)
        }
    }
}

/// Force the desired state to `Stopped`. Returns the error to surface:
/// the original one, or the patch failure if stopping failed too.
async fn stop_after_failed_identification(
    ctx: &PassContext<'_>,
    engine: &ChaosEngine,
    err: Error,
) -> Error {
    let mut stopped = engine.clone();
    stopped.spec.engine_state = Some(DesiredState::Stopped);

    match ctx.store.patch_object(engine, &stopped).await {
        Ok(_) => {
            ctx.emit(EngineEvent::operation_failed(format!(
                "(chaos start) Unable to identify target application: {err}"
            )));
            err
        }
        Err(patch_err) => {
            ctx.emit(EngineEvent::operation_failed(
                "(chaos stop) Unable to update chaosengine",
            ));
            warn!(error = %err, patch_error = %patch_err, "Unable to stop campaign after failed identification");
            patch_err.into()
        }
    }
}

/// Make sure the runner exists. A runner created in this pass has no
/// status worth inspecting yet, and a deleted one still being collected
/// blocks creation of its successor under the same name.
async fn ensure_runner(
    ctx: &PassContext<'_>,
    engine: &ChaosEngine,
    image: &str,
) -> Result<RunnerState> {
    let key = ObjectKey::new(engine.namespace(), engine.runner_name());
    if let Some(existing) = ctx.store.fetch::<Pod>(&key).await.not_found_as_none()? {
        if existing.metadata.is_deleting() {
            debug!(runner = %key, "Previous runner still terminating");
            return Ok(RunnerState::Terminating);
        }
        debug!(runner = %key, "Runner already exists");
        return Ok(RunnerState::Existing(existing));
    }

    let runner = ctx.runner_builder.build(&RunnerRequest {
        engine,
        image,
        client_uuid: &ctx.env.client_uuid,
    })?;
    info!(runner = %key, "Creating runner");
    match ctx.store.create_object(runner).await.already_exists_as_none()? {
        Some(_) => info!(runner = %key, "Runner created"),
        None => debug!(runner = %key, "Runner created concurrently"),
    }
    Ok(RunnerState::Launched)
}

/// Record completion once.
async fn mark_completed(ctx: &PassContext<'_>, mut engine: ChaosEngine) -> Result<()> {
    if engine.phase() == Some(EnginePhase::Completed) {
        return Ok(());
    }
    engine.status.engine_status = Some(EnginePhase::Completed);
    engine.spec.engine_state = Some(DesiredState::Stopped);
    ctx.store.update_object(engine).await?;
    info!("ChaosEngine completed");
    ctx.emit(EngineEvent::completed());
    Ok(())
}
