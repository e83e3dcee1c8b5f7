//! # Expiring Disk Cache
//!
//! Persists the result of an expensive call under
//! `<root>/<descriptor>-<seed>`, where `seed` is the order-sensitive key of
//! the descriptor and the call arguments.
//!
//! A record is valid only while it is strictly newer than its dependency
//! path. Touching the dependency (adding a kernel to a directory, rewriting a
//! kernel file) invalidates every record that depends on it:
//!
//! | record | dependency | outcome |
//! |--------|------------|---------|
//! | absent | present    | compute, write |
//! | newer  | present    | read, no compute |
//! | older or same age | present | delete, compute, write |
//! | any    | absent     | compute, nothing written |

use super::hash::{CacheArgs, cache_key};
use super::record::{decode_record, encode_record};
use crate::KernqlError;
use crate::primitives::MAX_RECORD_SIZE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// State of a record relative to its dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Fresh,
    Stale,
    Absent,
    NoDependency,
}

/// A directory of memoized results, each tied to a dependency path.
#[derive(Debug, Clone)]
pub struct ExpiringCache {
    root: PathBuf,
}

impl ExpiringCache {
    /// Open (creating if needed) the cache directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, KernqlError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            KernqlError::IoError(format!(
                "Failed to create cache directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the record for `descriptor` and `seed` lives.
    #[must_use]
    pub fn record_path(&self, descriptor: &str, seed: u64) -> PathBuf {
        self.root.join(format!("{}-{}", descriptor, seed))
    }

    /// Return the cached result of `compute(args)` or compute and persist it.
    pub fn memoize<A, R, F>(
        &self,
        descriptor: &str,
        args: &A,
        dependency: &Path,
        compute: F,
    ) -> Result<R, KernqlError>
    where
        A: CacheArgs + ?Sized,
        R: Serialize + DeserializeOwned,
        F: FnOnce(&A) -> Result<R, KernqlError>,
    {
        let seed = cache_key(descriptor, args);
        let record = self.record_path(descriptor, seed);

        match freshness(&record, dependency)? {
            Freshness::Fresh => {
                debug!(descriptor, seed, "cache hit");
                return read_record(&record);
            }
            Freshness::Stale => {
                debug!(descriptor, seed, dependency = %dependency.display(), "cache record stale");
                remove_record(&record)?;
            }
            Freshness::Absent => {
                debug!(descriptor, seed, "cache miss");
            }
            Freshness::NoDependency => {
                debug!(
                    descriptor,
                    dependency = %dependency.display(),
                    "cache dependency does not exist, not caching"
                );
                return compute(args);
            }
        }

        let value = compute(args)?;
        write_record(&record, &value)?;
        Ok(value)
    }

    /// Delete every record in the cache directory, and any temp file a
    /// crashed writer left behind; returns how many went. Other files are
    /// kept.
    pub fn clear(&self) -> Result<usize, KernqlError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            KernqlError::IoError(format!("Failed to read {}: {}", self.root.display(), e))
        })?;

        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|e| KernqlError::IoError(e.to_string()))?
                .path();
            let is_entry = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_cache_entry);
            if is_entry && path.is_file() {
                remove_record(&path)?;
                removed += 1;
            }
        }
        debug!(root = %self.root.display(), removed, "cache cleared");
        Ok(removed)
    }
}

/// `<descriptor>-<seed>` or its temp sibling `<descriptor>-<seed>.tmp-<pid>`.
fn is_cache_entry(name: &str) -> bool {
    let record = match name.rsplit_once(".tmp-") {
        Some((record, pid)) if is_decimal(pid) => record,
        Some(_) => return false,
        None => name,
    };
    record.rsplit_once('-').is_some_and(|(descriptor, seed)| {
        !descriptor.is_empty() && is_decimal(seed) && seed.parse::<u64>().is_ok()
    })
}

fn is_decimal(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn freshness(record: &Path, dependency: &Path) -> Result<Freshness, KernqlError> {
    let dependency_time = match fs::metadata(dependency) {
        Ok(meta) => modified(&meta, dependency)?,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Freshness::NoDependency),
        Err(e) => {
            return Err(KernqlError::IoError(format!(
                "Failed to stat {}: {}",
                dependency.display(),
                e
            )));
        }
    };
    let record_time = match fs::metadata(record) {
        Ok(meta) => modified(&meta, record)?,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Freshness::Absent),
        Err(e) => {
            return Err(KernqlError::IoError(format!(
                "Failed to stat {}: {}",
                record.display(),
                e
            )));
        }
    };

    if record_time > dependency_time {
        Ok(Freshness::Fresh)
    } else {
        Ok(Freshness::Stale)
    }
}

fn modified(meta: &fs::Metadata, path: &Path) -> Result<std::time::SystemTime, KernqlError> {
    meta.modified().map_err(|e| {
        KernqlError::IoError(format!(
            "No modification time for {}: {}",
            path.display(),
            e
        ))
    })
}

fn read_record<R: DeserializeOwned>(path: &Path) -> Result<R, KernqlError> {
    let len = fs::metadata(path)
        .map_err(|e| KernqlError::IoError(e.to_string()))?
        .len();
    if len > MAX_RECORD_SIZE {
        return Err(KernqlError::IoError(format!(
            "Cache record {} too large: {} bytes (max {} bytes)",
            path.display(),
            len,
            MAX_RECORD_SIZE
        )));
    }
    let bytes = fs::read(path).map_err(|e| {
        KernqlError::IoError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    decode_record(&bytes)
}

/// Write to a sibling temp file, then rename over the record.
fn write_record<R: Serialize>(path: &Path, value: &R) -> Result<(), KernqlError> {
    let bytes = encode_record(value)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            KernqlError::IoError(format!("Cache record path {} has no file name", path.display()))
        })?;
    let tmp = path.with_file_name(format!("{}.tmp-{}", file_name, std::process::id()));

    fs::write(&tmp, &bytes).map_err(|e| {
        KernqlError::IoError(format!("Failed to write {}: {}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        KernqlError::IoError(format!(
            "Failed to move {} to {}: {}",
            tmp.display(),
            path.display(),
            e
        ))
    })
}

fn remove_record(path: &Path) -> Result<(), KernqlError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(KernqlError::IoError(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
