//! # Listing
//!
//! Filesystem-backed and cached implementations of the `bridge` traits.
//!
//! The cached wrappers tie each result to a dependency path: a directory
//! listing to the directory, a kernel's coverage to the kernel file. Note
//! that a directory's mtime only moves when its direct entries change, so a
//! recursive listing is not invalidated by edits deeper down.

use crate::bridge::{CoverageSource, FileLister};
use crate::cache::{ExpiringCache, MemoryCache, Memoizer};
use crate::primitives::{LS_DESCRIPTOR, TIME_INTERVALS_DESCRIPTOR};
use crate::{Interval, KernqlError};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

// =============================================================================
// FILESYSTEM LISTER
// =============================================================================

/// Lists regular files with `walkdir`, sorted by file name at each level.
///
/// Symlinks are followed. Unreadable entries are logged and skipped so one
/// bad subdirectory does not hide the rest of a mission's kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl FileLister for FsLister {
    fn list_files(&self, root: &Path, recursive: bool) -> Result<Vec<String>, KernqlError> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    files.push(entry.path().to_string_lossy().into_owned());
                }
                Ok(_) => {}
                Err(e) => warn!(root = %root.display(), error = %e, "skipping unreadable entry"),
            }
        }
        Ok(files)
    }
}

// =============================================================================
// CACHED WRAPPERS
// =============================================================================

/// A `FileLister` whose results persist in an `ExpiringCache`.
pub struct CachedLister {
    memo: Memoizer<(String, bool), Vec<String>>,
}

impl CachedLister {
    pub fn new<L: FileLister + 'static>(cache: ExpiringCache, inner: L) -> Self {
        let memo = Memoizer::new(
            cache,
            LS_DESCRIPTOR,
            |(root, _): &(String, bool)| PathBuf::from(root),
            move |(root, recursive): &(String, bool)| inner.list_files(Path::new(root), *recursive),
        );
        Self { memo }
    }
}

impl FileLister for CachedLister {
    fn list_files(&self, root: &Path, recursive: bool) -> Result<Vec<String>, KernqlError> {
        self.memo
            .call(&(root.to_string_lossy().into_owned(), recursive))
    }
}

/// A `CoverageSource` memoized in memory for the life of the value and on
/// disk until the kernel file changes.
pub struct CachedCoverage {
    memo: Memoizer<(String,), Vec<Interval>>,
    memory: RefCell<MemoryCache>,
}

impl CachedCoverage {
    pub fn new<C: CoverageSource + Send + Sync + 'static>(cache: ExpiringCache, inner: C) -> Self {
        let memo = Memoizer::new(
            cache,
            TIME_INTERVALS_DESCRIPTOR,
            |(kernel,): &(String,)| PathBuf::from(kernel),
            move |(kernel,): &(String,)| inner.coverage_intervals(kernel),
        );
        Self {
            memo,
            memory: RefCell::new(MemoryCache::new()),
        }
    }
}

impl CoverageSource for CachedCoverage {
    fn coverage_intervals(&self, kernel: &str) -> Result<Vec<Interval>, KernqlError> {
        let args = (kernel.to_string(),);
        self.memory
            .borrow_mut()
            .memoize(TIME_INTERVALS_DESCRIPTOR, &args, |a| self.memo.call(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn lists_files_sorted_with_depth_control() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.bsp"), b"").expect("write");
        fs::write(dir.path().join("a.tls"), b"").expect("write");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");
        fs::write(dir.path().join("sub").join("c.bc"), b"").expect("write");

        let shallow = FsLister.list_files(dir.path(), false).expect("list");
        let names: Vec<&str> = shallow
            .iter()
            .filter_map(|p| Path::new(p).file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.tls", "b.bsp"]);

        let deep = FsLister.list_files(dir.path(), true).expect("list");
        assert_eq!(deep.len(), 3);
        assert!(deep.iter().any(|p| p.ends_with("c.bc")));
    }

    #[test]
    fn missing_root_lists_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let listed = FsLister
            .list_files(&dir.path().join("nope"), true)
            .expect("list");
        assert!(listed.is_empty());
    }

    struct CountingCoverage {
        calls: Arc<AtomicUsize>,
    }

    impl CoverageSource for CountingCoverage {
        fn coverage_intervals(&self, _kernel: &str) -> Result<Vec<Interval>, KernqlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Interval::new(0.0, 1.0)])
        }
    }

    #[test]
    fn coverage_is_read_once_per_kernel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kernel = dir.path().join("k.bc");
        fs::write(&kernel, b"").expect("write");
        let kernel = kernel.to_string_lossy().into_owned();

        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ExpiringCache::new(dir.path().join("cache")).expect("cache");
        let coverage = CachedCoverage::new(
            cache,
            CountingCoverage {
                calls: Arc::clone(&calls),
            },
        );

        for _ in 0..3 {
            let intervals = coverage.coverage_intervals(&kernel).expect("coverage");
            assert_eq!(intervals, vec![Interval::new(0.0, 1.0)]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cached_lister_matches_inner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dir.path().join("data");
        fs::create_dir(&data).expect("mkdir");
        fs::write(data.join("x.tpc"), b"").expect("write");

        let cache = ExpiringCache::new(dir.path().join("cache")).expect("cache");
        let lister = CachedLister::new(cache, FsLister);
        assert_eq!(
            lister.list_files(&data, true).expect("cached"),
            FsLister.list_files(&data, true).expect("direct")
        );
    }
}
