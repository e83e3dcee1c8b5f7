//! # Latest Selection
//!
//! Reduces a candidate list to the newest version of each distinct kernel.
//!
//! The default `FilenameVersionRanker` treats files as versions of the same
//! kernel when their file names agree up to the first digit
//! (`mro_sc_psp_230101.bc` and `mro_sc_psp_230215.bc` share `mro_sc_psp_`),
//! and ranks versions by file name. Candidates are sorted first, so the
//! result depends only on the candidate set, never on its order.

use crate::pointer::find_pointers_by_key;
use crate::primitives::KERNELS_KEY;
use crate::shape::{groups_to_value, kernel_groups};
use crate::KernqlError;
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;
use tracing::trace;

/// Picks the latest kernels out of one group of candidates.
pub trait LatestSelector: Send + Sync {
    fn select_latest(&self, candidates: &[String]) -> Result<Vec<String>, KernqlError>;
}

impl<F> LatestSelector for F
where
    F: Fn(&[String]) -> Result<Vec<String>, KernqlError> + Send + Sync,
{
    fn select_latest(&self, candidates: &[String]) -> Result<Vec<String>, KernqlError> {
        self(candidates)
    }
}

/// Group candidates into families and keep the maximum of each.
///
/// Candidates are visited in path order; families are emitted in order of
/// first appearance. Among equal maxima the later candidate wins.
pub fn latest_by<K, C>(candidates: &[String], family: K, compare: C) -> Vec<String>
where
    K: Fn(&str) -> String,
    C: Fn(&str, &str) -> Ordering,
{
    let mut sorted: Vec<&String> = candidates.iter().collect();
    sorted.sort();

    let mut families: Vec<(String, &String)> = Vec::new();
    for candidate in sorted {
        let key = family(candidate.as_str());
        match families.iter_mut().find(|(k, _)| *k == key) {
            Some((_, best)) => {
                if compare(candidate.as_str(), best.as_str()) != Ordering::Less {
                    *best = candidate;
                }
            }
            None => families.push((key, candidate)),
        }
    }
    families.into_iter().map(|(_, best)| best.clone()).collect()
}

// =============================================================================
// FILENAME VERSION RANKER
// =============================================================================

/// Versions share a file-name prefix and an extension; higher names are newer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameVersionRanker;

impl FilenameVersionRanker {
    fn file_name(path: &str) -> &str {
        Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
    }

    fn extension(path: &str) -> String {
        Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    fn family(path: &str) -> String {
        let name = Self::file_name(path);
        let end = name.find(|c: char| c.is_ascii_digit()).unwrap_or(name.len());
        name[..end].to_string()
    }
}

impl LatestSelector for FilenameVersionRanker {
    fn select_latest(&self, candidates: &[String]) -> Result<Vec<String>, KernqlError> {
        let Some(first) = candidates.first() else {
            return Ok(Vec::new());
        };

        let extension = Self::extension(first);
        if let Some(odd) = candidates.iter().find(|c| Self::extension(c) != extension) {
            return Err(KernqlError::InvalidArgument(format!(
                "The input extensions ({}) are not different versions of the same file {}",
                Self::file_name(odd),
                first
            )));
        }

        Ok(latest_by(candidates, Self::family, |a, b| {
            Self::file_name(a).cmp(Self::file_name(b))
        }))
    }
}

/// Replace every `kernels` group in `doc` by its latest members.
///
/// Every `kernels` value must already be expanded (a 2-D array or a single
/// path); a flat template list is `InvalidArgument`.
pub fn get_latest_kernels(doc: &Value, selector: &dyn LatestSelector) -> Result<Value, KernqlError> {
    let mut out = doc.clone();
    for pointer in find_pointers_by_key(doc, KERNELS_KEY, true) {
        let Some(value) = pointer.get(doc) else {
            continue;
        };
        let mut latest = Vec::new();
        for group in kernel_groups(value)? {
            let picked = selector.select_latest(&group)?;
            trace!(at = %pointer, kernels = ?picked, "latest kernels");
            latest.push(picked);
        }
        pointer.set(&mut out, groups_to_value(latest))?;
    }
    Ok(out)
}
