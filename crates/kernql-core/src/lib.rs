//! # kernql-core
//!
//! The kernel configuration engine for kernql - THE LOGIC.
//!
//! Mission configuration lives in JSON documents. Each names, per kernel
//! type, regular-expression templates for the kernel files on disk and
//! `deps` markers that splice in other parts of the tree. This crate
//! resolves those documents into concrete, filtered and version-selected
//! kernel path lists, and tracks which kernels are loaded into the
//! external numerical toolkit.
//!
//! ## Layers
//!
//! - `pointer`, `merge`, `resolve`: configuration tree algebra
//! - `query`, `latest`: kernel discovery, time/quality filtering, selection
//! - `cache`: expiring on-disk cache, in-memory cache, memoizer
//! - `config`: the facade tying the layers to a data directory
//! - `pool`: reference-counted kernel loading
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Synchronous and single-threaded; callers serialize access
//! - The toolkit is reached only through the `bridge` traits
//! - Source documents are never mutated; every resolution works on a copy

// =============================================================================
// MODULES
// =============================================================================

pub mod bridge;
pub mod cache;
pub mod config;
pub mod latest;
pub mod listing;
pub mod locations;
pub mod merge;
pub mod pointer;
pub mod pool;
pub mod primitives;
pub mod query;
pub mod resolve;
pub mod shape;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Interval, KernelType, KernqlError, Quality, TimeWindow};

// =============================================================================
// RE-EXPORTS: Configuration Trees
// =============================================================================

pub use config::Config;
pub use locations::Locations;
pub use merge::{merge_configs, merge_patch};
pub use pointer::{Pointer, find_pointers_by_key};
pub use resolve::resolve_dependencies;

// =============================================================================
// RE-EXPORTS: Kernel Queries
// =============================================================================

pub use latest::{FilenameVersionRanker, LatestSelector, get_latest_kernels};
pub use query::{
    SearchRequest, expand, filter_by_window, glob_kernels, kernels_as_set, kernels_as_vec,
    list_mission_kernels, paths_from_regex, search_and_refine_kernels, search_ephemeris_kernels,
    select_quality,
};

// =============================================================================
// RE-EXPORTS: Toolkit Bridge & Caches
// =============================================================================

pub use bridge::{CoverageSource, FileLister, ToolkitLoader};
pub use cache::{ExpiringCache, Memoizer, MemoryCache};
pub use listing::{CachedCoverage, CachedLister, FsLister};
pub use pool::{KernelPool, KernelSet};
