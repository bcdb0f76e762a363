//! The element trait surface: the abstract operations the engine needs.
//!
//! The orbit engine and the D-class decomposition are generic over an
//! element kind. Everything they require of it is collected in the
//! [`MonoidElement`] trait bundle: an associative in-place product,
//! an identity per degree, the λ- and ρ-invariants with their actions,
//! and the rank grading. λ- and ρ-values only need the lightweight
//! [`OrbitPoint`] bounds.
//!
//! One concrete kind ships with the crate: [`Transformation`]
//! (total maps on `{0, …, n−1}`), in [`transf`].

pub mod transf;

pub use transf::{ImageSet, Kernel, Transformation};

use crate::error::KoniecznyError;

/// Canonical bound set for orbit points (λ-values, ρ-values, tuples).
///
/// Rationale:
/// - `Clone + Default` so engines can keep reusable scratch points
/// - `Eq + Hash` for the orbit's position map
/// - `Ord` for deterministic ordering of enumerated data
/// - `Debug` for diagnostics and invariant checks
pub trait OrbitPoint: Clone + Default + Eq + std::hash::Hash + Ord + std::fmt::Debug {}
impl<T> OrbitPoint for T where T: Clone + Default + Eq + std::hash::Hash + Ord + std::fmt::Debug {}

/// The trait bundle consumed by the orbit engine and the decomposition.
///
/// Multiplication must be associative, equality decidable, and hashing
/// consistent with equality. Every element carries a positive *degree*
/// bounding its domain and a non-negative *rank* that agrees with the
/// cardinality of its λ-value.
pub trait MonoidElement:
    Clone + Default + Eq + std::hash::Hash + Ord + std::fmt::Debug
{
    /// The λ-value kind (typically the image).
    type Lambda: OrbitPoint;
    /// The ρ-value kind (typically the kernel).
    type Rho: OrbitPoint;

    /// Write `x · y` into `dst`, overwriting its previous state.
    ///
    /// `tid` selects a thread-local scratch slot for kinds that need
    /// one; the engine is single-threaded and always passes `0`, but
    /// the parameter is preserved for composability.
    fn product(dst: &mut Self, x: &Self, y: &Self, tid: usize);

    /// The identity element of degree `n`.
    fn identity_of_degree(n: usize) -> Result<Self, KoniecznyError>;

    /// The number of points in the element's domain. Always positive.
    fn degree(&self) -> usize;

    /// The rank grading; agrees with the cardinality of the λ-value.
    fn rank(&self) -> usize;

    /// Whether this element is a unit of the full monoid on its degree.
    fn is_unit(&self) -> bool;

    /// Write the λ-value of `self` into `dst`.
    fn lambda_value(&self, dst: &mut Self::Lambda) -> Result<(), KoniecznyError>;

    /// Write the ρ-value of `self` into `dst`.
    fn rho_value(&self, dst: &mut Self::Rho) -> Result<(), KoniecznyError>;

    /// Write `pt · x` (the right action on λ-values) into `dst`.
    fn lambda_action(dst: &mut Self::Lambda, pt: &Self::Lambda, x: &Self);

    /// Write `x · pt` (the left action on ρ-values) into `dst`.
    fn rho_action(dst: &mut Self::Rho, pt: &Self::Rho, x: &Self);

    /// Whether the H-class with coordinates `(lambda, rho)` contains an
    /// idempotent (i.e. is a group).
    ///
    /// For transformations this says that the image set is a transversal
    /// of the kernel partition.
    fn is_group_h_class(rho: &Self::Rho, lambda: &Self::Lambda) -> bool;

    /// Convenience: the λ-value of `x` as a fresh point.
    fn lambda_of(x: &Self) -> Result<Self::Lambda, KoniecznyError> {
        let mut dst = Self::Lambda::default();
        x.lambda_value(&mut dst)?;
        Ok(dst)
    }

    /// Convenience: the ρ-value of `x` as a fresh point.
    fn rho_of(x: &Self) -> Result<Self::Rho, KoniecznyError> {
        let mut dst = Self::Rho::default();
        x.rho_value(&mut dst)?;
        Ok(dst)
    }

    /// Convenience: `x · y` as a fresh element.
    fn product_of(x: &Self, y: &Self, tid: usize) -> Self {
        let mut dst = Self::default();
        Self::product(&mut dst, x, y, tid);
        dst
    }

    /// Whether `x` is idempotent.
    fn is_idempotent(x: &Self) -> bool {
        Self::product_of(x, x, 0) == *x
    }
}
