//! Deletion guard lifecycle.
//!
//! The guard is a finalizer token. While present, the store keeps a
//! deleted campaign around so the delete path can clean up its children.

use chaos_core::{ChaosEngine, GUARD_FINALIZER};

/// Whether the campaign carries the guard.
pub fn has_guard(engine: &ChaosEngine) -> bool {
    engine
        .metadata
        .finalizers
        .iter()
        .any(|f| f == GUARD_FINALIZER)
}

/// Add the guard. Returns `false` if it was already present.
pub fn add_guard(engine: &mut ChaosEngine) -> bool {
    if has_guard(engine) {
        return false;
    }
    engine.metadata.finalizers.push(GUARD_FINALIZER.to_string());
    true
}

/// Remove every copy of the guard, keeping other finalizers. Returns
/// whether anything was removed.
pub fn remove_guard(engine: &mut ChaosEngine) -> bool {
    let before = engine.metadata.finalizers.len();
    engine.metadata.finalizers.retain(|f| f != GUARD_FINALIZER);
    engine.metadata.finalizers.len() != before
}
