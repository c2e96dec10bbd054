//! JSON merge patch (RFC 7386) helpers.
//!
//! Status writers compute a patch from a captured base to the desired
//! object, so fields they did not touch are never overwritten.

use serde_json::{Map, Value};

/// Compute the merge patch turning `base` into `target`. Removed keys
/// become `null`; arrays and scalars are replaced wholesale.
pub fn create_merge_patch(base: &Value, target: &Value) -> Value {
    match (base, target) {
        (Value::Object(base), Value::Object(target)) => {
            let mut patch = Map::new();
            for (key, base_value) in base {
                match target.get(key) {
                    None => {
                        patch.insert(key.clone(), Value::Null);
                    }
                    Some(target_value) if target_value != base_value => {
                        patch.insert(key.clone(), create_merge_patch(base_value, target_value));
                    }
                    Some(_) => {}
                }
            }
            for (key, target_value) in target {
                if !base.contains_key(key) {
                    patch.insert(key.clone(), target_value.clone());
                }
            }
            Value::Object(patch)
        }
        _ => target.clone(),
    }
}

/// Apply a merge patch in place.
pub fn apply_merge_patch(doc: &mut Value, patch: &Value) {
    json_patch::merge(doc, patch);
}

/// Whether a patch changes nothing.
pub fn is_empty_patch(patch: &Value) -> bool {
    patch.as_object().is_some_and(Map::is_empty)
}

/// Drop a nested key from a patch, e.g. the concurrency token, so the
/// patch applies regardless of the stored version.
pub fn strip_path(patch: &mut Value, path: &[&str]) {
    match path {
        [] => {}
        [last] => {
            if let Some(map) = patch.as_object_mut() {
                map.remove(*last);
            }
        }
        [head, rest @ ..] => {
            let emptied = patch
                .get_mut(*head)
                .map(|child| {
                    strip_path(child, rest);
                    is_empty_patch(child)
                })
                .unwrap_or(false);
            if emptied {
                if let Some(map) = patch.as_object_mut() {
                    map.remove(*head);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_patch_only_carries_changes() {
        let base = json!({"metadata": {"name": "e", "finalizers": ["guard"]}, "status": {"phase": "initialized"}});
        let target = json!({"metadata": {"name": "e"}, "status": {"phase": "stopped"}});

        let patch = create_merge_patch(&base, &target);

        assert_eq!(
            patch,
            json!({"metadata": {"finalizers": null}, "status": {"phase": "stopped"}})
        );
    }

    #[test]
    fn test_patch_preserves_concurrent_edits() {
        let base = json!({"spec": {"state": "active", "label": "a"}, "status": {"phase": "initialized"}});
        let target = json!({"spec": {"state": "active", "label": "a"}, "status": {"phase": "stopped"}});
        // Someone else changed the label after the base was captured.
        let mut current = json!({"spec": {"state": "active", "label": "b"}, "status": {"phase": "initialized"}});

        apply_merge_patch(&mut current, &create_merge_patch(&base, &target));

        assert_eq!(
            current,
            json!({"spec": {"state": "active", "label": "b"}, "status": {"phase": "stopped"}})
        );
    }

    #[test]
    fn test_strip_path() {
        let mut patch = json!({"metadata": {"resourceVersion": 4}, "status": {"phase": "stopped"}});
        strip_path(&mut patch, &["metadata", "resourceVersion"]);
        assert_eq!(patch, json!({"status": {"phase": "stopped"}}));
    }

    #[test]
    fn test_identical_documents_yield_empty_patch() {
        let doc = json!({"a": {"b": [1, 2]}});
        assert!(is_empty_patch(&create_merge_patch(&doc, &doc)));
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,4}".prop_map(Value::from),
            prop::collection::vec(any::<u8>().prop_map(Value::from), 0..3).prop_map(Value::Array),
        ]
    }

    fn document() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn prop_patch_applied_to_base_yields_target(
            base in prop::collection::btree_map("[a-d]", document(), 0..4),
            target in prop::collection::btree_map("[a-d]", document(), 0..4),
        ) {
            let base = Value::Object(base.into_iter().collect());
            let target = Value::Object(target.into_iter().collect());

            let mut doc = base.clone();
            apply_merge_patch(&mut doc, &create_merge_patch(&base, &target));

            prop_assert_eq!(doc, target);
        }
    }
}
