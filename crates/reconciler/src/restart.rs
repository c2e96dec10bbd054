//! Restart handlers.
//!
//! Both reset the campaign to `Initialized` with no experiment statuses so
//! the next pass provisions a fresh runner.

use chaos_core::ChaosEngine;
use chaos_store::ObjectStoreExt;
use tracing::info;

use crate::error::Result;
use crate::events::EngineEvent;
use crate::guard::remove_guard;
use crate::teardown::force_remove;
use crate::types::PassContext;

/// Reactivated after an abort: clear leftovers and reset, written with a
/// conflict-checked update.
///
/// # Errors
///
/// Propagates teardown and update failures.
pub async fn after_abort(ctx: &PassContext<'_>, mut engine: ChaosEngine) -> Result<()> {
    force_remove(ctx, &engine).await?;

    ctx.emit(EngineEvent::restarting());
    engine.reset_for_restart();
    ctx.store.update_object(engine).await?;
    info!("ChaosEngine restarted after abort");
    Ok(())
}

/// Reactivated after completion: clear retained children, reset, and drop
/// the stale guard so the next pass installs it again and announces the
/// new run.
///
/// # Errors
///
/// Propagates teardown and patch failures.
pub async fn after_complete(ctx: &PassContext<'_>, engine: ChaosEngine) -> Result<()> {
    let base = engine.clone();
    force_remove(ctx, &engine).await?;

    let mut engine = engine;
    engine.reset_for_restart();
    remove_guard(&mut engine);
    if let Err(e) = ctx.store.patch_object(&base, &engine).await {
        ctx.emit(EngineEvent::operation_failed(
            "(chaos restart) Unable to update chaosengine",
        ));
        return Err(e.into());
    }
    info!("ChaosEngine restarted after completion");
    Ok(())
}
