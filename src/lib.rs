//! # konieczny
//!
//! konieczny computes the Green's-relation structure (the partition
//! into D-classes with their internal L/R/H substructure) of a
//! finitely generated transformation monoid, using Konieczny's
//! algorithm. The semigroup is never multiplied out: it is represented
//! implicitly through two group actions (the λ-action on images and
//! the ρ-action on kernels) on a small state space, from which every
//! element's class membership is decided by products in a cached group.
//!
//! ## Features
//! - Generic action orbit engine with Gabow SCC decomposition and
//!   Schreier multiplier tracing
//! - Regular and non-regular D-class construction, group-index search,
//!   idempotent location, exact membership testing, rank-graded
//!   enumeration
//! - Element-reuse cache for scratch elements during in-place products
//! - A trait surface ([`element::MonoidElement`]) for plugging in new
//!   element kinds; transformations ship with the crate
//!
//! ## Usage
//! Add `konieczny` as a dependency in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! konieczny = "0.1"
//! # Optional features:
//! # features = ["strict-invariants"]
//! ```
//!
//! The engine is single-threaded; the `strict-invariants` and
//! `check-invariants` features enable internal validation in release
//! builds (debug builds always validate).
//!
//! ```
//! use konieczny::prelude::*;
//!
//! let s = Konieczny::new(vec![
//!     Transformation::from_images([1, 0, 2, 3, 4]).unwrap(),
//!     Transformation::from_images([1, 2, 3, 4, 0]).unwrap(),
//!     Transformation::from_images([0, 0, 2, 3, 4]).unwrap(),
//! ])
//! .unwrap();
//! assert_eq!(s.size(), 3125);
//! ```

// Re-export our major subsystems:
pub mod cache;
pub mod element;
pub mod error;
pub mod invariants;
pub mod konieczny;
pub mod orbit;

pub use crate::konieczny::Konieczny;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::cache::{CacheGuard, ElementCache, TrivialCache};
    pub use crate::element::{ImageSet, Kernel, MonoidElement, OrbitPoint, Transformation};
    pub use crate::error::KoniecznyError;
    pub use crate::invariants::{AuditInvariants, InvariantReport};
    pub use crate::konieczny::{DClass, DClassId, Konieczny, NonRegularDClass, RegularDClass};
    pub use crate::orbit::{Action, GradedOrbit, OnImages, OnKernels, OnTuples, Orbit};
}
