//! # Engine Primitives
//!
//! Hardcoded constants for the kernel engine.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Reserved key marking a dependency list inside a configuration tree.
pub const DEPS_KEY: &str = "deps";

/// Key under which a kernel entry lists its filename templates.
pub const KERNELS_KEY: &str = "kernels";

/// Key of the configuration section shared by every mission.
pub const BASE_KEY: &str = "base";

/// Maximum number of dependency resolution passes.
///
/// This bounds, without detecting, dependency cycles: a chain needing more
/// passes than this is reported as `RecursionLimitExceeded`.
pub const MAX_DEPENDENCY_PASSES: usize = 10;

/// Golden-ratio constant folded in by `hash_combine`.
pub const HASH_COMBINE_CONSTANT: u64 = 0x9e37_79b9;

/// Magic bytes for the cache record header.
///
/// - File Header = Magic Bytes ("KQLC") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"KQLC";

/// Current cache record format version.
///
/// Increment this when making breaking changes to the record encoding.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum size of a cache record accepted on read (256 MB).
pub const MAX_RECORD_SIZE: u64 = 256 * 1024 * 1024;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Variables naming the mission data directory, in precedence order.
pub const DATA_DIR_VARS: [&str; 3] = ["SPICEROOT", "ALESPICEROOT", "ISISDATA"];

/// Variable naming the configuration directory.
pub const CONFIG_DIR_VAR: &str = "KERNQL_CONFIG_DIR";

/// Variable naming the installation prefix searched for configuration.
pub const PREFIX_VAR: &str = "CONDA_PREFIX";

/// Variable naming the cache directory.
pub const CACHE_DIR_VAR: &str = "KERNQL_CACHE_DIR";

// =============================================================================
// CACHE DESCRIPTORS
// =============================================================================

/// Descriptor of the memoized directory listing.
pub const LS_DESCRIPTOR: &str = "kernql_ls";

/// Descriptor of the memoized coverage lookup.
pub const TIME_INTERVALS_DESCRIPTOR: &str = "kernql_time_intervals";
