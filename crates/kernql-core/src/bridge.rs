//! # External Boundaries
//!
//! Traits for the work the engine delegates. Binary kernels are only ever
//! read or loaded by the external toolkit.
//!
//! Implementations are supplied by the caller; the engine ships
//! `FsLister` and the cached wrappers in `listing`.

use crate::{Interval, KernqlError};
use std::path::Path;

/// Lists the files below a directory.
pub trait FileLister: Send + Sync {
    /// Every file path under `root`, in a deterministic order.
    ///
    /// When `recursive` is false only direct children are listed. A root that
    /// does not exist lists as empty.
    fn list_files(&self, root: &Path, recursive: bool) -> Result<Vec<String>, KernqlError>;
}

/// Reads the coverage intervals of a binary kernel.
pub trait CoverageSource {
    fn coverage_intervals(&self, kernel: &str) -> Result<Vec<Interval>, KernqlError>;
}

/// The toolkit's kernel pool.
///
/// `furnish` must tolerate a path that is already loaded; `unfurnish` one
/// that is not.
pub trait ToolkitLoader {
    fn furnish(&mut self, path: &str) -> Result<(), KernqlError>;
    fn unfurnish(&mut self, path: &str) -> Result<(), KernqlError>;
}
