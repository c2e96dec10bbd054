//! Outcome merging from result annotations.
//!
//! Runners report per-target outcomes as annotations on the companion
//! result, keyed `"<kind>/<name>"` with a value of `injected`, `reverted`
//! or `targeted` in any case. Syncing moves each recognised report into
//! the target history and deletes the annotation, so a report is consumed
//! once. Anything else in the annotation map is left untouched.

use chaos_core::chaos_result::parse_target_key;
use chaos_core::{ChaosResult, TargetOutcome};
use chaos_store::{ObjectStoreExt, RESULT_DEFINITION};
use tracing::{debug, info};

use crate::error::Result;
use crate::types::PassContext;

/// Consume every recognised outcome annotation into the target history.
/// Returns how many annotations were consumed.
pub fn merge_outcomes(result: &mut ChaosResult) -> usize {
    let reports: Vec<(String, String, String, String)> = result
        .metadata
        .annotations
        .iter()
        .filter(|(_, value)| TargetOutcome::recognise(value).is_some())
        .filter_map(|(key, value)| {
            parse_target_key(key).map(|(kind, name)| {
                (key.clone(), kind.to_string(), name.to_string(), value.clone())
            })
        })
        .collect();

    for (key, kind, name, status) in &reports {
        result.record_target(kind, name, status);
        result.metadata.annotations.remove(key);
    }
    reports.len()
}

/// Merge outcome reports on every result correlated with the campaign and
/// persist the ones that changed. When the operator watches every
/// namespace and the result definition is not installed, this is a no-op.
/// Returns how many results were written.
///
/// # Errors
///
/// Propagates discovery, listing and update failures.
pub async fn sync_results(ctx: &PassContext<'_>) -> Result<usize> {
    if ctx.env.is_cluster_scoped() && !ctx.discovery.crd_exists(RESULT_DEFINITION).await? {
        debug!(definition = RESULT_DEFINITION, "Result definition not installed, skipping sync");
        return Ok(0);
    }

    let results: Vec<ChaosResult> = ctx
        .store
        .list_objects(ctx.namespace(), &ctx.correlated())
        .await?;

    let mut written = 0;
    for mut result in results {
        let consumed = merge_outcomes(&mut result);
        if consumed == 0 {
            continue;
        }
        info!(chaosresult = %result.metadata.name, consumed, "Updating chaos status inside chaosresult");
        ctx.store.update_object(result).await?;
        written += 1;
    }
    Ok(written)
}
