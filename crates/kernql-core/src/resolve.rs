//! # Dependency Resolution
//!
//! A `deps` marker is an object member whose value is a pointer string or a
//! list of pointer strings. Each pointer names a location in the source
//! (un-merged) tree whose content is merged into the marker's parent.
//!
//! Resolution repeats scan-and-merge passes until a scan finds no marker.
//! A `deps` member holding an object is kernel metadata (sclk/pck
//! companions), not a marker, and is left in place.

use crate::merge::merge_configs;
use crate::pointer::{Pointer, find_pointers_by_key};
use crate::primitives::{DEPS_KEY, MAX_DEPENDENCY_PASSES};
use crate::shape::string_list;
use crate::KernqlError;
use serde_json::Value;
use tracing::{debug, trace};

/// Replace every marker in `config` with the merged content it references in
/// `source`. Returns the number of passes it took.
///
/// Fails with `RecursionLimitExceeded` when more than
/// `MAX_DEPENDENCY_PASSES` passes would be needed; this is how cycles
/// surface.
pub fn resolve_dependencies(config: &mut Value, source: &Value) -> Result<usize, KernqlError> {
    let mut passes = 0;

    loop {
        let markers = dependency_markers(config);
        if markers.is_empty() {
            debug!(passes, "config dependencies resolved");
            return Ok(passes);
        }

        passes += 1;
        if passes > MAX_DEPENDENCY_PASSES {
            return Err(KernqlError::RecursionLimitExceeded(MAX_DEPENDENCY_PASSES));
        }

        for marker in markers {
            let Some(list) = marker.get(config) else {
                continue;
            };
            let deps = string_list(list)?;
            marker.erase(config);

            for dep in deps {
                merge_dependency(config, source, &dep, &marker)?;
            }
        }
    }
}

/// Apply the markers sitting directly on each ancestor of `pointer`,
/// outermost first, so content an ancestor inherits is addressable below it.
/// Markers inside the subtree at `pointer` are left for
/// `resolve_dependencies`. Returns the number of dependencies merged.
pub fn resolve_ancestors(
    tree: &mut Value,
    source: &Value,
    pointer: &Pointer,
) -> Result<usize, KernqlError> {
    let mut merged = 0;

    for depth in 0..pointer.len() {
        let Some(ancestor) = pointer.prefix(depth) else {
            break;
        };
        let marker = ancestor.child(DEPS_KEY);
        let mut passes = 0;

        loop {
            let deps = match marker.get(tree) {
                Some(list @ (Value::String(_) | Value::Array(_))) => string_list(list)?,
                _ => break,
            };
            passes += 1;
            if passes > MAX_DEPENDENCY_PASSES {
                return Err(KernqlError::RecursionLimitExceeded(MAX_DEPENDENCY_PASSES));
            }
            marker.erase(tree);
            for dep in deps {
                merge_dependency(tree, source, &dep, &marker)?;
                merged += 1;
            }
        }
    }

    debug!(pointer = %pointer, merged, "ancestor dependencies resolved");
    Ok(merged)
}

fn merge_dependency(
    config: &mut Value,
    source: &Value,
    dep: &str,
    marker: &Pointer,
) -> Result<(), KernqlError> {
    let parent = marker.parent();
    let from = Pointer::parse(dep)?;
    let fragment = from.get(source).ok_or_else(|| {
        KernqlError::NotFound(format!(
            "dependency {} referenced from {} does not exist",
            from, marker
        ))
    })?;
    let target = parent.get_mut(config).ok_or_else(|| {
        KernqlError::NotFound(format!("dependency target {} vanished", parent))
    })?;
    trace!(from = %from, into = %parent, "merging dependency");
    merge_configs(target, fragment)
}

fn dependency_markers(config: &Value) -> Vec<Pointer> {
    find_pointers_by_key(config, DEPS_KEY, true)
        .into_iter()
        .filter(|p| matches!(p.get(config), Some(Value::String(_) | Value::Array(_))))
        .collect()
}

/// Follow the `deps` of `pointer` to the first dependency that `exists`.
///
/// Dependencies are tried in order; one that does not exist is followed
/// through its own `deps` before moving on to the next.
pub fn root_dependency<F>(tree: &Value, pointer: &Pointer, exists: F) -> Result<Option<Pointer>, KernqlError>
where
    F: Fn(&Pointer) -> bool,
{
    root_dependency_at(tree, pointer, &exists, 0)
}

fn root_dependency_at<F>(
    tree: &Value,
    pointer: &Pointer,
    exists: &F,
    depth: usize,
) -> Result<Option<Pointer>, KernqlError>
where
    F: Fn(&Pointer) -> bool,
{
    if depth > MAX_DEPENDENCY_PASSES {
        return Err(KernqlError::RecursionLimitExceeded(MAX_DEPENDENCY_PASSES));
    }
    let deps = match pointer.child(DEPS_KEY).get(tree) {
        Some(list @ (Value::String(_) | Value::Array(_))) => string_list(list)?,
        _ => return Ok(None),
    };

    for dep in deps {
        let dep = Pointer::parse(&dep)?;
        if exists(&dep) {
            return Ok(Some(dep));
        }
        if let Some(found) = root_dependency_at(tree, &dep, exists, depth + 1)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

// =============================================================================
// TESTS
// =============================================================================
