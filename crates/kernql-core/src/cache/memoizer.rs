//! # Memoizer
//!
//! Binds a named computation to an `ExpiringCache` so callers invoke it like
//! a plain function. Each call is keyed by the descriptor and its arguments.

use super::disk::ExpiringCache;
use super::hash::CacheArgs;
use crate::KernqlError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

type DependencyFn<A> = Box<dyn Fn(&A) -> PathBuf + Send + Sync>;
type ComputeFn<A, R> = Box<dyn Fn(&A) -> Result<R, KernqlError> + Send + Sync>;

/// A function wrapped in an `ExpiringCache`.
///
/// The dependency selector picks, from the call arguments, the path whose
/// modification time bounds the validity of a stored result.
pub struct Memoizer<A, R> {
    descriptor: String,
    cache: ExpiringCache,
    dependency: DependencyFn<A>,
    compute: ComputeFn<A, R>,
}

impl<A, R> Memoizer<A, R>
where
    A: CacheArgs,
    R: Serialize + DeserializeOwned,
{
    pub fn new(
        cache: ExpiringCache,
        descriptor: impl Into<String>,
        dependency: impl Fn(&A) -> PathBuf + Send + Sync + 'static,
        compute: impl Fn(&A) -> Result<R, KernqlError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptor: descriptor.into(),
            cache,
            dependency: Box::new(dependency),
            compute: Box::new(compute),
        }
    }

    pub fn call(&self, args: &A) -> Result<R, KernqlError> {
        let dependency = (self.dependency)(args);
        self.cache
            .memoize(&self.descriptor, args, &dependency, |a| (self.compute)(a))
    }

    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}
