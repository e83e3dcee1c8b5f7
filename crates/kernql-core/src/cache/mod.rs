//! # Cache Module
//!
//! Memoization of expensive filesystem lookups.
//!
//! - `hash`: order-sensitive keys built from a descriptor and call arguments
//! - `record`: the on-disk record encoding (header + postcard)
//! - `disk`: `ExpiringCache`, records invalidated by a dependency's mtime
//! - `memory`: `MemoryCache`, a process-lifetime memo table
//! - `memoizer`: `Memoizer`, a function bound to an `ExpiringCache`

pub mod disk;
pub mod hash;
pub mod memoizer;
pub mod memory;
pub mod record;

pub use disk::ExpiringCache;
pub use hash::{CacheArgs, cache_key, hash_combine, stable_hash};
pub use memoizer::Memoizer;
pub use memory::{CacheValue, CachedValue, MemoryCache};
