//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the kernel engine:
//! - Kernel classification (`KernelType`, `Quality`)
//! - Time coverage (`Interval`, `TimeWindow`)
//! - Error types (`KernqlError`)
//!
//! ## Ordering Guarantees
//!
//! `Quality` implements `Ord` in rank order (worst to best), so tier
//! fallback can walk it with plain comparisons. `KernelType` implements `Ord`
//! only so it can key `BTreeMap`s deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// KERNEL TYPE
// =============================================================================

/// The closed set of kernel types a configuration may describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelType {
    Ck,
    Spk,
    Tspk,
    Lsk,
    Mk,
    Sclk,
    Iak,
    Ik,
    Fk,
    Dsk,
    Pck,
    Ek,
}

impl KernelType {
    /// Every kernel type, in configuration-key order.
    pub const ALL: [KernelType; 12] = [
        KernelType::Ck,
        KernelType::Spk,
        KernelType::Tspk,
        KernelType::Lsk,
        KernelType::Mk,
        KernelType::Sclk,
        KernelType::Iak,
        KernelType::Ik,
        KernelType::Fk,
        KernelType::Dsk,
        KernelType::Pck,
        KernelType::Ek,
    ];

    /// The configuration key for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ck => "ck",
            Self::Spk => "spk",
            Self::Tspk => "tspk",
            Self::Lsk => "lsk",
            Self::Mk => "mk",
            Self::Sclk => "sclk",
            Self::Iak => "iak",
            Self::Ik => "ik",
            Self::Fk => "fk",
            Self::Dsk => "dsk",
            Self::Pck => "pck",
            Self::Ek => "ek",
        }
    }

    /// Binary kernels with per-segment time coverage.
    ///
    /// Only these are subject to time-window filtering.
    #[must_use]
    pub const fn is_time_bearing(self) -> bool {
        matches!(self, Self::Ck | Self::Spk)
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelType {
    type Err = KernqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| KernqlError::InvalidArgument(format!("{} is not a valid kernel type", s)))
    }
}

// =============================================================================
// QUALITY
// =============================================================================

/// Precision class of a kernel, ranked worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Quality does not apply (text kernels) or is irrelevant.
    Na,
    /// Based on the predicted future location of the body.
    Predicted,
    /// Assumes nadir pointing.
    Nadir,
    /// Supplemented by real spacecraft data.
    Reconstructed,
    /// Controlled kernels.
    Smithed,
}

impl Quality {
    /// Every tier, worst first.
    pub const ALL: [Quality; 5] = [
        Quality::Na,
        Quality::Predicted,
        Quality::Nadir,
        Quality::Reconstructed,
        Quality::Smithed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Na => "na",
            Self::Predicted => "predicted",
            Self::Nadir => "nadir",
            Self::Reconstructed => "reconstructed",
            Self::Smithed => "smithed",
        }
    }

    /// Tiers to try when `self` is requested, best first, stopping above `na`.
    ///
    /// Requesting `na` yields just `[na]`.
    #[must_use]
    pub fn fallback_chain(self) -> Vec<Quality> {
        if self == Quality::Na {
            return vec![Quality::Na];
        }
        Self::ALL
            .iter()
            .rev()
            .copied()
            .filter(|q| *q <= self && *q != Quality::Na)
            .collect()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = KernqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|q| q.as_str() == s).ok_or_else(|| {
            let names: Vec<&str> = Self::ALL.iter().map(|q| q.as_str()).collect();
            KernqlError::InvalidArgument(format!(
                "{} is not a valid kernel quality, available qualities are: {}",
                s,
                names.join(", ")
            ))
        })
    }
}

// =============================================================================
// TIME COVERAGE
// =============================================================================

/// A `(begin, end)` span over which a kernel provides data.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Interval {
    pub begin: f64,
    pub end: f64,
}

impl Interval {
    #[must_use]
    pub const fn new(begin: f64, end: f64) -> Self {
        Self { begin, end }
    }

    /// Inclusive overlap with a closed window.
    #[must_use]
    pub fn overlaps(&self, window: &TimeWindow) -> bool {
        self.begin <= window.stop && self.end >= window.start
    }
}

/// A caller-requested closed interval `[start, stop]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub stop: f64,
}

impl TimeWindow {
    /// Create a window, rejecting `start > stop` and NaN bounds.
    pub fn new(start: f64, stop: f64) -> Result<Self, KernqlError> {
        if start.is_nan() || stop.is_nan() || start > stop {
            return Err(KernqlError::InvalidArgument(format!(
                "Invalid time window [{}, {}]",
                start, stop
            )));
        }
        Ok(Self { start, stop })
    }

    /// A window holding a single instant.
    pub fn at(time: f64) -> Result<Self, KernqlError> {
        Self::new(time, time)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the kernel engine.
///
/// - No silent failures
/// - Every error aborts only the query that raised it
/// - Resolution works on copies, so a failure never leaves a half-merged
///   tree visible to other callers
#[derive(Debug, Error)]
pub enum KernqlError {
    /// Malformed pointer, unknown type or quality, malformed template input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An object and a non-object met at the same key during a merge.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Dependency resolution did not converge within the pass limit.
    #[error("Could not resolve config dependencies, max recursion depth of {0} reached")]
    RecursionLimitExceeded(usize),

    /// A referenced mission, file or pointer is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A resource was released without having been acquired.
    #[error("Resource state error: {0}")]
    ResourceStateError(String),

    /// Popping past the root of a pointer.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A configuration document could not be parsed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Filesystem, cache record or environment failure.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
