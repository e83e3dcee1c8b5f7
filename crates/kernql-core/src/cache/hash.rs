//! Order-sensitive cache keys.
//!
//! Each argument is hashed on its own and folded into a running seed:
//! `seed ^= hash(arg) + 0x9e3779b9 + (seed << 6) + (seed >> 2)`.
//! Folding is not commutative, so argument order changes the key.
//!
//! Per-argument hashes come from BLAKE3 rather than `DefaultHasher` because
//! cache file names are shared between processes and must not depend on a
//! per-build hasher.

use crate::primitives::HASH_COMBINE_CONSTANT;
use std::hash::{Hash, Hasher};

struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }
}

impl Hasher for StableHasher {
    fn finish(&self) -> u64 {
        let digest = self.inner.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }
}

/// Hash a single value, stable across processes.
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = StableHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Fold one value into `seed`.
pub fn hash_combine<T: Hash + ?Sized>(seed: u64, value: &T) -> u64 {
    seed ^ stable_hash(value)
        .wrapping_add(HASH_COMBINE_CONSTANT)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// An argument list that can be folded into a cache key, element by element.
///
/// Implemented for tuples of up to four hashable elements; use `(x,)` for a
/// single argument.
pub trait CacheArgs {
    fn fold_into(&self, seed: u64) -> u64;
}

macro_rules! impl_cache_args {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: Hash),+> CacheArgs for ($($ty,)+) {
            fn fold_into(&self, seed: u64) -> u64 {
                let ($($var,)+) = self;
                let mut seed = seed;
                $( seed = hash_combine(seed, $var); )+
                seed
            }
        }
    };
}

impl_cache_args!(A a);
impl_cache_args!(A a, B b);
impl_cache_args!(A a, B b, C c);
impl_cache_args!(A a, B b, C c, D d);

/// Key of a memoized call: the descriptor, then every argument in order.
pub fn cache_key<A: CacheArgs + ?Sized>(descriptor: &str, args: &A) -> u64 {
    args.fold_into(hash_combine(0, descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_paths_distinct_seeds() {
        let s1 = hash_combine(0, "/isisdata/mro/kernels/ck");
        let s2 = hash_combine(0, "/isisdata/mro/kernels/spk");
        assert_ne!(s1, s2);
    }

    #[test]
    fn flag_changes_key() {
        let root = "/isisdata/mro/kernels/ck".to_string();
        assert_ne!(
            cache_key("kernql_ls", &(root.clone(), false)),
            cache_key("kernql_ls", &(root, true))
        );
    }

    #[test]
    fn combine_is_order_sensitive() {
        let ab = hash_combine(hash_combine(7, "a"), "b");
        let ba = hash_combine(hash_combine(7, "b"), "a");
        assert_ne!(ab, ba);

        assert_ne!(
            cache_key("d", &("left", "right")),
            cache_key("d", &("right", "left"))
        );
    }

    #[test]
    fn keys_are_reproducible() {
        assert_eq!(stable_hash("kernel.bsp"), stable_hash("kernel.bsp"));
        assert_eq!(
            cache_key("kernql_ls", &("/data".to_string(), true)),
            cache_key("kernql_ls", &("/data".to_string(), true))
        );
    }
}
