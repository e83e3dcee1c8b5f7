//! In-process memoization, keyed the same way as the disk cache.
//!
//! Entries hold one of a closed set of result shapes. Looking up a key
//! whose entry has a different shape than the caller expects counts as a
//! miss and the entry is replaced.

use super::hash::{CacheArgs, cache_key};
use crate::{Interval, KernqlError};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

/// A memoized result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Paths(Vec<String>),
    Groups(Vec<Vec<String>>),
    Intervals(Vec<Interval>),
    Code(i64),
    Name(String),
    Document(Value),
}

/// A result type that can live in a `MemoryCache`.
pub trait CacheValue: Sized {
    fn to_cached(&self) -> CachedValue;
    fn from_cached(cached: &CachedValue) -> Option<Self>;
}

macro_rules! impl_cache_value {
    ($ty:ty, $variant:ident) => {
        impl CacheValue for $ty {
            fn to_cached(&self) -> CachedValue {
                CachedValue::$variant(self.clone())
            }

            fn from_cached(cached: &CachedValue) -> Option<Self> {
                match cached {
                    CachedValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_cache_value!(Vec<String>, Paths);
impl_cache_value!(Vec<Vec<String>>, Groups);
impl_cache_value!(Vec<Interval>, Intervals);
impl_cache_value!(i64, Code);
impl_cache_value!(String, Name);
impl_cache_value!(Value, Document);

/// Process-lifetime memo table.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: BTreeMap<u64, CachedValue>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored result for `(descriptor, args)` or compute and store it.
    pub fn memoize<A, R, F>(&mut self, descriptor: &str, args: &A, compute: F) -> Result<R, KernqlError>
    where
        A: CacheArgs + ?Sized,
        R: CacheValue,
        F: FnOnce(&A) -> Result<R, KernqlError>,
    {
        let key = cache_key(descriptor, args);
        if let Some(hit) = self.entries.get(&key).and_then(R::from_cached) {
            trace!(descriptor, key, "memory cache hit");
            return Ok(hit);
        }

        let value = compute(args)?;
        self.entries.insert(key, value.to_cached());
        Ok(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_call_is_served_from_memory() {
        let mut cache = MemoryCache::new();
        let mut calls = 0;

        let a: i64 = cache
            .memoize("code", &("MRO",), |_| {
                calls += 1;
                Ok(-74)
            })
            .expect("compute");
        let b: i64 = cache
            .memoize("code", &("MRO",), |_| {
                calls += 1;
                Ok(0)
            })
            .expect("hit");

        assert_eq!((a, b), (-74, -74));
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shape_mismatch_is_a_miss() {
        let mut cache = MemoryCache::new();
        let _: i64 = cache.memoize("d", &(1u8,), |_| Ok(5)).expect("code");
        let name: String = cache
            .memoize("d", &(1u8,), |_| Ok("replaced".to_string()))
            .expect("name");
        assert_eq!(name, "replaced");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn errors_are_not_stored() {
        let mut cache = MemoryCache::new();
        let result: Result<Vec<String>, _> = cache.memoize("ls", &("/x",), |_| {
            Err(KernqlError::NotFound("/x".to_string()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
