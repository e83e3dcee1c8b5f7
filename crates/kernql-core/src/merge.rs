//! # Merge Module
//!
//! Deep merge of configuration trees.
//!
//! `merge_configs` is the dependency merge: objects recurse, an object
//! meeting a non-object is a `TypeMismatch`, and two non-objects are
//! promoted into a sequence (base values first, then incoming values, in
//! encounter order). This is the only place duplicate values can enter a
//! sequence; nothing is de-duplicated.
//!
//! `merge_patch` is plain RFC 7386, used to union per-type kernel listings.

use crate::KernqlError;
use serde_json::{Map, Value};

/// Merge `incoming` into `base` in place.
///
/// On error `base` may hold the keys merged before the conflicting one;
/// callers merge into copies.
pub fn merge_configs(base: &mut Value, incoming: &Value) -> Result<(), KernqlError> {
    let Value::Object(incoming_map) = incoming else {
        return Err(KernqlError::TypeMismatch(
            "Invalid merge. Cannot merge a non-object into a config.".to_string(),
        ));
    };
    if base.is_null() {
        *base = Value::Object(Map::new());
    }
    let Value::Object(base_map) = base else {
        return Err(KernqlError::TypeMismatch(
            "Invalid merge. Cannot merge an object into a non-object.".to_string(),
        ));
    };

    for (key, value) in incoming_map {
        if !base_map.contains_key(key.as_str()) {
            base_map.insert(key.clone(), value.clone());
            continue;
        }
        let Some(existing) = base_map.get_mut(key.as_str()) else {
            continue;
        };

        match (existing.is_object(), value.is_object()) {
            (true, true) => merge_configs(existing, value)?,
            (true, false) | (false, true) => {
                return Err(KernqlError::TypeMismatch(format!(
                    "Invalid merge at '{}'. Cannot merge an object with a non-object.",
                    key
                )));
            }
            (false, false) => promote_and_extend(existing, value),
        }
    }
    Ok(())
}

fn promote_and_extend(existing: &mut Value, incoming: &Value) {
    if !existing.is_array() {
        *existing = Value::Array(vec![existing.take()]);
    }
    if let Value::Array(items) = existing {
        match incoming {
            Value::Array(more) => items.extend(more.iter().cloned()),
            single => items.push(single.clone()),
        }
    }
}

/// Apply an RFC 7386 merge patch.
///
/// Null members of `patch` delete the key from `target`.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.shift_remove(key.as_str());
            } else {
                merge_patch(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
