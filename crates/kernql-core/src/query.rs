//! # Kernel Query
//!
//! Turning configuration entries into concrete kernel paths and narrowing
//! them down.
//!
//! ## Operations
//!
//! - `expand` / `paths_from_regex`: regex templates to path groups
//! - `glob_kernels` / `list_mission_kernels`: expand whole mission documents
//! - `search_ephemeris_kernels`: time-window filter over ck/spk tiers
//! - `select_quality`: exact quality tier lookup
//! - `search_and_refine_kernels`: the full mission query
//!
//! ## Determinism
//!
//! Listings are sorted, templates are applied in input order, and groups are
//! emitted in template order, so the same filesystem and configuration always
//! produce the same document.

use crate::bridge::{CoverageSource, FileLister};
use crate::config::Config;
use crate::latest::get_latest_kernels;
use crate::merge::merge_patch;
use crate::pointer::{Pointer, find_pointers_by_key};
use crate::primitives::{BASE_KEY, DEPS_KEY, KERNELS_KEY};
use crate::shape::{groups_to_value, kernel_groups, string_list};
use crate::{KernelType, KernqlError, Quality, TimeWindow};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Kernel types whose `deps` may carry their own templates.
const DEPENDENT_TYPES: [KernelType; 2] = [KernelType::Sclk, KernelType::Pck];

/// `deps` member passed through untouched.
const OBJS_KEY: &str = "objs";

// =============================================================================
// REGEX EXPANSION
// =============================================================================

/// Match every template against one listing of `root`.
///
/// One group per template that matched at least one file, in template order.
/// Matching is an unanchored search over the full path.
pub fn expand(
    lister: &dyn FileLister,
    root: &Path,
    templates: &[String],
) -> Result<Vec<Vec<String>>, KernqlError> {
    let patterns = templates
        .iter()
        .map(|t| {
            Regex::new(t).map_err(|e| {
                KernqlError::InvalidArgument(format!("Invalid kernel template '{}': {}", t, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let files = lister.list_files(root, true)?;
    debug!(root = %root.display(), files = files.len(), templates = templates.len(), "expanding templates");

    let mut groups = Vec::new();
    for pattern in &patterns {
        let matched: Vec<String> = files
            .iter()
            .filter(|f| pattern.is_match(f))
            .cloned()
            .collect();
        trace!(template = pattern.as_str(), matched = matched.len(), "template matched");
        if !matched.is_empty() {
            groups.push(matched);
        }
    }
    Ok(groups)
}

/// `expand` over a JSON string or array of strings.
pub fn paths_from_regex(
    lister: &dyn FileLister,
    root: &Path,
    templates: &Value,
) -> Result<Vec<Vec<String>>, KernqlError> {
    expand(lister, root, &string_list(templates)?)
}

// =============================================================================
// DOCUMENT EXPANSION
// =============================================================================

/// Expand every entry of `kernel_type` found anywhere in `conf`.
///
/// The result mirrors the entries' positions: direct `kernels`, each quality
/// tier's `kernels`, and `sclk`/`pck` templates inside `deps` are replaced by
/// path groups. `deps.objs` is copied as is. Tiers matching nothing are left
/// out.
pub fn glob_kernels(
    lister: &dyn FileLister,
    root: &Path,
    conf: &Value,
    kernel_type: KernelType,
) -> Result<Value, KernqlError> {
    let mut out = Value::Object(Map::new());

    for pointer in find_pointers_by_key(conf, kernel_type.as_str(), true) {
        let Some(category) = pointer.get(conf) else {
            continue;
        };

        if let Some(templates) = category.get(KERNELS_KEY) {
            let groups = paths_from_regex(lister, root, templates)?;
            pointer
                .child(KERNELS_KEY)
                .set(&mut out, groups_to_value(groups))?;
        }
        glob_deps(lister, root, category, &pointer, &mut out)?;

        for quality in Quality::ALL {
            let Some(tier) = category.get(quality.as_str()) else {
                continue;
            };
            let at = pointer.child(quality.as_str());
            if let Some(templates) = tier.get(KERNELS_KEY) {
                let groups = paths_from_regex(lister, root, templates)?;
                if !groups.is_empty() {
                    at.child(KERNELS_KEY).set(&mut out, groups_to_value(groups))?;
                }
            }
            glob_deps(lister, root, tier, &at, &mut out)?;
        }
    }
    Ok(out)
}

fn glob_deps(
    lister: &dyn FileLister,
    root: &Path,
    entry: &Value,
    at: &Pointer,
    out: &mut Value,
) -> Result<(), KernqlError> {
    let Some(Value::Object(deps)) = entry.get(DEPS_KEY) else {
        return Ok(());
    };
    let deps_at = at.child(DEPS_KEY);

    for kernel_type in DEPENDENT_TYPES {
        if let Some(templates) = deps.get(kernel_type.as_str()) {
            let groups = paths_from_regex(lister, root, templates)?;
            deps_at
                .child(kernel_type.as_str())
                .set(out, groups_to_value(groups))?;
        }
    }
    if let Some(objs) = deps.get(OBJS_KEY) {
        deps_at.child(OBJS_KEY).set(out, objs.clone())?;
    }
    Ok(())
}

/// Expand every kernel type of a mission document and union the results.
pub fn list_mission_kernels(
    lister: &dyn FileLister,
    root: &Path,
    conf: &Value,
) -> Result<Value, KernqlError> {
    let mut kernels = Value::Object(Map::new());
    for kernel_type in KernelType::ALL {
        merge_patch(&mut kernels, &glob_kernels(lister, root, conf, kernel_type)?);
    }
    Ok(kernels)
}

// =============================================================================
// FLATTENING
// =============================================================================

/// Every kernel path in `doc`, in document order, duplicates kept.
///
/// `doc` may be a document holding `kernels` leaves or a bare 2-D array.
pub fn kernels_as_vec(doc: &Value) -> Result<Vec<String>, KernqlError> {
    let pointers = find_pointers_by_key(doc, KERNELS_KEY, true);
    if pointers.is_empty() && doc.is_array() {
        return Ok(kernel_groups(doc)?.into_iter().flatten().collect());
    }

    let mut out = Vec::new();
    for pointer in pointers {
        match pointer.get(doc) {
            None | Some(Value::Null) => warn!(at = %pointer, "no kernels to collect"),
            Some(Value::Array(items)) if items.is_empty() => {
                warn!(at = %pointer, "no kernels to collect");
            }
            Some(value) => out.extend(kernel_groups(value)?.into_iter().flatten()),
        }
    }
    Ok(out)
}

/// Every distinct kernel path in `doc`, sorted.
pub fn kernels_as_set(doc: &Value) -> Result<BTreeSet<String>, KernqlError> {
    Ok(kernels_as_vec(doc)?.into_iter().collect())
}

// =============================================================================
// TIME AND QUALITY FILTERS
// =============================================================================

/// Kernels with at least one coverage interval overlapping `window`.
pub fn filter_by_window(
    paths: &[String],
    window: &TimeWindow,
    coverage: &dyn CoverageSource,
) -> Result<Vec<String>, KernqlError> {
    let mut kept = Vec::with_capacity(paths.len());
    for path in paths {
        let intervals = coverage.coverage_intervals(path)?;
        if intervals.iter().any(|i| i.overlaps(window)) {
            kept.push(path.clone());
        } else {
            trace!(kernel = %path, "outside time window");
        }
    }
    Ok(kept)
}

fn filter_groups(
    groups: Vec<Vec<String>>,
    window: &TimeWindow,
    coverage: &dyn CoverageSource,
) -> Result<Vec<Vec<String>>, KernqlError> {
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let kept = filter_by_window(&group, window, coverage)?;
        if !kept.is_empty() {
            out.push(kept);
        }
    }
    Ok(out)
}

/// Apply the time filter to one kernel entry.
///
/// Entries of types without per-segment coverage come back unchanged. For
/// time-bearing types the direct `kernels` and every tier's `kernels` are
/// filtered; groups left empty are dropped.
pub fn filter_entry(
    kernel_type: KernelType,
    entry: &Value,
    window: &TimeWindow,
    coverage: &dyn CoverageSource,
) -> Result<Value, KernqlError> {
    let mut out = entry.clone();
    if !kernel_type.is_time_bearing() {
        return Ok(out);
    }

    let mut leaves = vec![Pointer::from_segments([KERNELS_KEY])];
    leaves.extend(
        Quality::ALL
            .iter()
            .map(|q| Pointer::from_segments([q.as_str(), KERNELS_KEY])),
    );

    for leaf in leaves {
        let Some(kernels) = leaf.get(entry) else {
            continue;
        };
        let filtered = filter_groups(kernel_groups(kernels)?, window, coverage)?;
        leaf.set(&mut out, groups_to_value(filtered))?;
    }
    Ok(out)
}

/// Time-filter every ck and spk entry found anywhere in `doc`.
pub fn search_ephemeris_kernels(
    doc: &Value,
    window: &TimeWindow,
    coverage: &dyn CoverageSource,
) -> Result<Value, KernqlError> {
    let mut out = doc.clone();
    for kernel_type in [KernelType::Ck, KernelType::Spk] {
        for pointer in find_pointers_by_key(doc, kernel_type.as_str(), true) {
            let Some(entry) = pointer.get(doc) else {
                continue;
            };
            if !entry.is_object() {
                continue;
            }
            debug!(at = %pointer, "filtering by time window");
            pointer.set(&mut out, filter_entry(kernel_type, entry, window, coverage)?)?;
        }
    }
    Ok(out)
}

/// The kernel groups of exactly one quality tier; an absent tier is empty.
pub fn select_quality(entry: &Value, quality: Quality) -> Result<Vec<Vec<String>>, KernqlError> {
    match entry
        .get(quality.as_str())
        .and_then(|tier| tier.get(KERNELS_KEY))
    {
        Some(kernels) => kernel_groups(kernels),
        None => Ok(Vec::new()),
    }
}

// =============================================================================
// SEARCH AND REFINE
// =============================================================================

/// Parameters of `search_and_refine_kernels`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub mission: String,
    /// Keep only ck/spk kernels covering this window. `None` skips the filter.
    pub window: Option<TimeWindow>,
    pub ck_quality: Quality,
    pub spk_quality: Quality,
    pub types: Vec<KernelType>,
}

impl SearchRequest {
    /// All kernel types, reconstructed quality, no time filter.
    pub fn new(mission: impl Into<String>) -> Self {
        Self {
            mission: mission.into(),
            window: None,
            ck_quality: Quality::Reconstructed,
            spk_quality: Quality::Reconstructed,
            types: KernelType::ALL.to_vec(),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    #[must_use]
    pub fn with_ck_quality(mut self, quality: Quality) -> Self {
        self.ck_quality = quality;
        self
    }

    #[must_use]
    pub fn with_spk_quality(mut self, quality: Quality) -> Self {
        self.spk_quality = quality;
        self
    }

    #[must_use]
    pub fn with_types(mut self, types: Vec<KernelType>) -> Self {
        self.types = types;
        self
    }
}

/// The full query: the latest kernels of the requested types for a mission
/// and for the shared `base` section.
///
/// Returns `{"base": {...}, "<mission>": {...}}`.
pub fn search_and_refine_kernels(
    config: &Config,
    request: &SearchRequest,
    coverage: &dyn CoverageSource,
) -> Result<Value, KernqlError> {
    let mission = request.mission.as_str();
    if !config.contains(mission) {
        return Err(KernqlError::NotFound(format!(
            "Couldn't find {} in config explicitly, please request a mission from the config [{}]",
            mission,
            config.mission_keys().join(", ")
        )));
    }

    let mission_kernels = evaluated_section(config, mission)?;
    let base_kernels = if config.contains(BASE_KEY) {
        evaluated_section(config, BASE_KEY)?
    } else {
        Value::Object(Map::new())
    };

    let mut refined_mission = restrict_types(&mission_kernels, &request.types);
    let refined_base = restrict_types(&base_kernels, &request.types);

    if let Some(window) = &request.window {
        refined_mission = search_ephemeris_kernels(&refined_mission, window, coverage)?;
    }
    for (kernel_type, quality) in [
        (KernelType::Ck, request.ck_quality),
        (KernelType::Spk, request.spk_quality),
    ] {
        fall_back_quality(&mut refined_mission, kernel_type, quality)?;
    }

    let selector = config.selector();
    let mut result = Map::new();
    result.insert(
        BASE_KEY.to_string(),
        get_latest_kernels(&refined_base, selector)?,
    );
    result.insert(
        mission.to_string(),
        get_latest_kernels(&refined_mission, selector)?,
    );
    Ok(Value::Object(result))
}

fn evaluated_section(config: &Config, key: &str) -> Result<Value, KernqlError> {
    let doc = config.get(key)?;
    Ok(doc.get(key).cloned().unwrap_or_else(|| json!({})))
}

fn restrict_types(section: &Value, types: &[KernelType]) -> Value {
    let mut out = Map::new();
    for kernel_type in types {
        if let Some(entry) = section.get(kernel_type.as_str()) {
            out.insert(kernel_type.as_str().to_string(), entry.clone());
        }
    }
    Value::Object(out)
}

/// Replace a tiered entry by its best non-empty tier at or below `quality`.
fn fall_back_quality(
    section: &mut Value,
    kernel_type: KernelType,
    quality: Quality,
) -> Result<(), KernqlError> {
    let key = kernel_type.as_str();
    let Some(entry) = section.get(key) else {
        return Ok(());
    };
    let tiered = Quality::ALL
        .iter()
        .any(|q| entry.get(q.as_str()).is_some());
    if !tiered {
        return Ok(());
    }

    for tier in quality.fallback_chain() {
        if !select_quality(entry, tier)?.is_empty() {
            debug!(kernel_type = key, requested = %quality, chosen = %tier, "quality selected");
            let chosen = entry.get(tier.as_str()).cloned().unwrap_or(Value::Null);
            if let Some(slot) = section.get_mut(key) {
                *slot = chosen;
            }
            return Ok(());
        }
    }

    warn!(kernel_type = key, requested = %quality, "no kernels at or below requested quality");
    if let Some(slot) = section.get_mut(key) {
        *slot = json!({ KERNELS_KEY: [] });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
