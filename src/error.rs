//! Unified error type for the public APIs of this crate.
//!
//! Every fallible operation returns this enum; public APIs never panic.
//! Internal invariants are additionally audited in debug builds (see
//! [`crate::invariants`]).

use thiserror::Error;

/// Unified error type for Green's-relation computations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KoniecznyError {
    /// A degree exceeds the compile-time capacity of a λ- or ρ-value
    /// representation (e.g. the 64-entry image bitset).
    #[error("degree {degree} exceeds the capacity {max} of the point representation")]
    DegreeOutOfRange {
        /// The offending degree.
        degree: usize,
        /// The representation's capacity.
        max: usize,
    },
    /// The decomposition was asked to work with no generators.
    #[error("at least one generator is required")]
    EmptyGenerators,
    /// Generators of differing degrees were supplied.
    #[error("generators must share a degree: expected {expected}, found {found}")]
    MixedGeneratorDegrees {
        /// Degree of the first generator.
        expected: usize,
        /// The mismatched degree.
        found: usize,
    },
    /// A transformation image value is out of bounds for its degree.
    #[error("image value {value} out of bounds for a transformation of degree {degree}")]
    InvalidImage {
        /// The offending image value.
        value: usize,
        /// The transformation's degree.
        degree: usize,
    },
    /// `acquire` was called on an element cache with an empty pool.
    #[error("attempted to acquire an element, but none are acquirable")]
    CacheEmpty,
    /// `release` was handed an element this cache never issued.
    #[error("attempted to release an element not owned by this cache")]
    NotOwned,
    /// `add_generator` was called after the orbit had been run.
    #[error("generators cannot be added once the orbit has run; reset it first")]
    Frozen,
    /// Derived data (SCCs, multipliers) was queried before `run`.
    #[error("queried data has not been computed yet")]
    NotComputed,
    /// An internal invariant was observed broken.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
