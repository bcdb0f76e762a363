//! Actions: how generators move orbit points.
//!
//! An [`Action`] couples a point kind with the rule for applying an
//! element to a point, plus the composition rule for Schreier
//! multipliers. The latter depends on the side the action acts from:
//! for a right action the multiplier for "apply `a`, then `b`" is
//! `a · b`, for a left action it is `b · a`.

use crate::element::{MonoidElement, OrbitPoint};

/// An action of elements `E` on points.
pub trait Action<E> {
    /// The point kind acted on.
    type Point: OrbitPoint;

    /// Write the image of `pt` under `g` into `dst`.
    fn apply(dst: &mut Self::Point, pt: &Self::Point, g: &E);

    /// Write into `dst` the element acting as "`first`, then `then`".
    fn chain(dst: &mut E, first: &E, then: &E, tid: usize);
}

/// The right action on λ-values (`pt · x`).
#[derive(Copy, Clone, Debug, Default)]
pub struct OnImages;

impl<E: MonoidElement> Action<E> for OnImages {
    type Point = E::Lambda;

    #[inline]
    fn apply(dst: &mut E::Lambda, pt: &E::Lambda, g: &E) {
        E::lambda_action(dst, pt, g);
    }

    #[inline]
    fn chain(dst: &mut E, first: &E, then: &E, tid: usize) {
        E::product(dst, first, then, tid);
    }
}

/// The left action on ρ-values (`x · pt`).
#[derive(Copy, Clone, Debug, Default)]
pub struct OnKernels;

impl<E: MonoidElement> Action<E> for OnKernels {
    type Point = E::Rho;

    #[inline]
    fn apply(dst: &mut E::Rho, pt: &E::Rho, g: &E) {
        E::rho_action(dst, pt, g);
    }

    #[inline]
    fn chain(dst: &mut E, first: &E, then: &E, tid: usize) {
        // Left action: applying `first` then `then` is the element
        // `then · first`.
        E::product(dst, then, first, tid);
    }
}

/// The right action on ordered tuples of points.
///
/// Implemented per element kind; see
/// [`crate::element::transf`] for the transformation instance.
#[derive(Copy, Clone, Debug, Default)]
pub struct OnTuples;
