//! # Kernel Pool
//!
//! Reference counting in front of the toolkit's process-global kernel pool.
//!
//! The pool is an ordinary value passed to whoever needs it; there is no
//! hidden global. It is single-threaded: callers sharing it across threads
//! must serialize access themselves.
//!
//! ## Load/Unload Asymmetry
//!
//! Loading an already-loaded path only bumps its count (and re-furnishes
//! when forced). Unloading calls `unfurnish` on every release, even while the
//! count stays above zero. The toolkit keeps one copy per furnish, so this
//! may be unintended, but existing callers rely on it.

use crate::bridge::ToolkitLoader;
use crate::query::kernels_as_vec;
use crate::KernqlError;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Reference-counted kernel loading.
#[derive(Debug)]
pub struct KernelPool<L: ToolkitLoader> {
    loader: L,
    ref_counts: BTreeMap<String, u32>,
}

impl<L: ToolkitLoader> KernelPool<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            ref_counts: BTreeMap::new(),
        }
    }

    /// Acquire `path`; returns its new reference count.
    pub fn load(&mut self, path: &str, force_reload: bool) -> Result<u32, KernqlError> {
        debug!(path, force_reload, "furnishing kernel");
        let loaded = self.ref_counts.contains_key(path);
        if !loaded || force_reload {
            self.loader.furnish(path)?;
        }

        let count = self.ref_counts.entry(path.to_string()).or_insert(0);
        *count += 1;
        trace!(path, count = *count, "kernel reference count");
        Ok(*count)
    }

    /// Release `path`; returns its remaining reference count.
    pub fn unload(&mut self, path: &str) -> Result<u32, KernqlError> {
        let Some(count) = self.ref_counts.get(path).copied() else {
            return Err(KernqlError::ResourceStateError(format!(
                "{} is not a kernel that has been loaded.",
                path
            )));
        };

        self.loader.unfurnish(path)?;

        if count <= 1 {
            self.ref_counts.remove(path);
            trace!(path, "kernel released");
            return Ok(0);
        }
        let remaining = count - 1;
        self.ref_counts.insert(path.to_string(), remaining);
        trace!(path, count = remaining, "kernel reference count");
        Ok(remaining)
    }

    /// Current count of `path`; 0 when not loaded.
    #[must_use]
    pub fn ref_count(&self, path: &str) -> u32 {
        self.ref_counts.get(path).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn ref_counts(&self) -> &BTreeMap<String, u32> {
        &self.ref_counts
    }

    /// Every loaded path, sorted.
    #[must_use]
    pub fn loaded_kernels(&self) -> Vec<String> {
        self.ref_counts.keys().cloned().collect()
    }

    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Load every kernel of `doc` for the lifetime of the returned guard.
    ///
    /// If a load fails, kernels already loaded by this call are released
    /// before the error is returned.
    pub fn furnish_set(&mut self, doc: &Value) -> Result<KernelSet<'_, L>, KernqlError> {
        let paths = kernels_as_vec(doc)?;
        let mut set = KernelSet {
            pool: self,
            paths: Vec::with_capacity(paths.len()),
        };
        for path in paths {
            set.pool.load(&path, true)?;
            set.paths.push(path);
        }
        Ok(set)
    }
}

/// Kernels loaded by `KernelPool::furnish_set`, released on drop.
#[derive(Debug)]
pub struct KernelSet<'a, L: ToolkitLoader> {
    pool: &'a mut KernelPool<L>,
    paths: Vec<String>,
}

impl<L: ToolkitLoader> KernelSet<'_, L> {
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    #[must_use]
    pub fn pool(&self) -> &KernelPool<L> {
        self.pool
    }
}

impl<L: ToolkitLoader> Drop for KernelSet<'_, L> {
    fn drop(&mut self) {
        for path in self.paths.iter().rev() {
            if let Err(e) = self.pool.unload(path) {
                warn!(path = %path, error = %e, "failed to release kernel");
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
