//! Child workload teardown.
//!
//! Forced teardown bulk-deletes every job and pod carrying the campaign's
//! correlation label. Graceful teardown deletes the campaign's pods one by
//! one, and only when the cleanup policy asks for it. The delete path
//! combines forced teardown with the convergence wait, the result sync and
//! the final status write.

use chaos_core::{
    ChaosEngine, CleanupPolicy, DesiredState, EnginePhase, ObjectKind, Pod, APP_LABEL,
};
use chaos_store::{DeleteOptions, ObjectStoreExt, StoreResultExt};
use chrono::Utc;
use itertools::Itertools;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::events::EngineEvent;
use crate::guard::remove_guard;
use crate::status_sync::sync_results;
use crate::types::PassContext;

/// Kinds removed by forced teardown, in deletion order.
pub const FORCED_KINDS: [ObjectKind; 2] = [ObjectKind::Job, ObjectKind::Pod];

/// Delete options for forced teardown: background propagation, and the
/// campaign's grace period when it sets one.
pub fn forced_delete_options(engine: &ChaosEngine) -> DeleteOptions {
    let grace = engine.spec.termination_grace_period_seconds;
    DeleteOptions::background().with_grace_period((grace != 0).then_some(grace))
}

/// Bulk-delete every correlated job and pod. Each kind is attempted even
/// if an earlier one failed.
///
/// # Errors
///
/// Returns [`Error::PartialTeardown`] naming every kind that failed.
pub async fn force_remove(ctx: &PassContext<'_>, engine: &ChaosEngine) -> Result<()> {
    let options = forced_delete_options(engine);
    let selector = ctx.correlated();

    let mut failed = Vec::new();
    for kind in FORCED_KINDS {
        if let Err(e) = ctx
            .store
            .delete_all_of(kind, ctx.namespace(), &selector, &options)
            .await
        {
            warn!(%kind, error = %e, "Bulk delete failed");
            failed.push(kind);
        }
    }

    if failed.is_empty() {
        debug!(?options, "Forced teardown issued");
        return Ok(());
    }
    ctx.emit(EngineEvent::operation_failed(format!(
        "(chaos stop) Unable to delete chaos resources: {} allocated to chaosengine",
        failed.iter().map(|k| k.plural()).join(", ")
    )));
    Err(Error::partial_teardown(failed))
}

/// Delete the campaign's own pods one at a time when the cleanup policy
/// is `Delete`. Stops at the first failure. Returns how many were deleted.
///
/// # Errors
///
/// Propagates the listing error or the first deletion error.
pub async fn graceful_remove(ctx: &PassContext<'_>, engine: &ChaosEngine) -> Result<usize> {
    if engine.spec.job_clean_up_policy != CleanupPolicy::Delete {
        debug!("Cleanup policy retains chaos pods");
        return Ok(0);
    }

    let selector = ctx.correlated().with(APP_LABEL, engine.name());
    let pods: Vec<Pod> = ctx.store.list_objects(ctx.namespace(), &selector).await?;
    for pod in &pods {
        ctx.store
            .delete(ObjectKind::Pod, &pod.metadata.key(), &DeleteOptions::default())
            .await
            .ignore_not_found()?;
    }
    info!(count = pods.len(), "Chaos pods removed per cleanup policy");
    Ok(pods.len())
}

/// Poll the correlated pod listing until it is empty, at most
/// `convergence_attempts` times with `convergence_interval` in between.
/// A failed listing counts as an attempt.
///
/// # Errors
///
/// Returns [`Error::ConvergenceTimeout`] when pods remain after the last
/// attempt.
pub async fn await_convergence(ctx: &PassContext<'_>) -> Result<()> {
    let attempts = ctx.config.convergence_attempts;
    let selector = ctx.correlated();
    let mut remaining = 0;

    for attempt in 1..=attempts {
        match ctx.store.list(ObjectKind::Pod, ctx.namespace(), &selector).await {
            Ok(pods) if pods.is_empty() => {
                debug!(attempt, "Chaos pods gone");
                return Ok(());
            }
            Ok(pods) => {
                remaining = pods.len();
                trace!(attempt, remaining, "Chaos pods not deleted yet");
            }
            Err(e) => {
                debug!(attempt, error = %e, "Listing chaos pods failed");
            }
        }
        if attempt < attempts {
            tokio::time::sleep(ctx.config.convergence_interval).await;
        }
    }

    warn!(attempts, remaining, "Chaos pods still present after convergence wait");
    Err(Error::convergence_timeout(attempts, remaining))
}

/// Shared teardown for deletion and forced stop.
///
/// Forced teardown runs only when correlated pods exist; the convergence
/// wait and the result sync always run. The guard is then removed,
/// in-flight experiments are aborted and the phase becomes `Stopped`, all
/// written as one merge patch against the campaign as loaded.
///
/// # Errors
///
/// Propagates listing, teardown, convergence, sync and patch failures. A
/// campaign that disappeared before the final patch is not an error.
pub async fn delete_path(ctx: &PassContext<'_>, engine: ChaosEngine) -> Result<()> {
    let base = engine.clone();
    info!("Checking for chaos resources to delete");

    let pods = match ctx
        .store
        .list(ObjectKind::Pod, ctx.namespace(), &ctx.correlated())
        .await
    {
        Ok(pods) => pods,
        Err(e) => {
            ctx.emit(EngineEvent::operation_failed(
                "(chaos stop) Unable to list chaos experiment pods",
            ));
            return Err(e.into());
        }
    };
    let found = !pods.is_empty();

    if found {
        info!(pods = pods.len(), "Force deleting chaos resources");
        if let Err(e) = force_remove(ctx, &engine).await {
            ctx.emit(EngineEvent::operation_failed(
                "(chaos stop) Unable to delete chaos experiment pods",
            ));
            return Err(e);
        }
    }

    await_convergence(ctx).await?;
    sync_results(ctx).await?;

    let mut engine = engine;
    remove_guard(&mut engine);
    let aborted = engine.abort_in_flight_experiments(Utc::now());
    engine.status.engine_status = Some(EnginePhase::Stopped);

    if let Err(e) = ctx
        .store
        .patch_object(&base, &engine)
        .await
        .not_found_as_none()
    {
        ctx.emit(EngineEvent::operation_failed(
            "(chaos stop) Unable to update chaosengine",
        ));
        return Err(e.into());
    }
    info!(aborted, "ChaosEngine stopped");

    ctx.emit(if found {
        EngineEvent::stopped()
    } else {
        EngineEvent::stopped_without_resources()
    });
    Ok(())
}

/// Policy-gated cleanup after natural completion, then settle the desired
/// state on `Stopped`.
///
/// # Errors
///
/// Propagates cleanup and patch failures.
pub async fn complete_stop(ctx: &PassContext<'_>, engine: ChaosEngine) -> Result<()> {
    if let Err(e) = graceful_remove(ctx, &engine).await {
        ctx.emit(EngineEvent::operation_failed(
            "(chaos completion) Unable to delete chaos pods upon chaos completion",
        ));
        return Err(e);
    }

    let base = engine.clone();
    let mut engine = engine;
    engine.spec.engine_state = Some(DesiredState::Stopped);
    if let Err(e) = ctx.store.patch_object(&base, &engine).await {
        ctx.emit(EngineEvent::operation_failed(
            "(chaos completion) Unable to update chaosengine",
        ));
        return Err(e.into());
    }
    Ok(())
}
