//! D-classes: the data each class carries and its pure queries.
//!
//! A D-class stores its representative, the left/right multiplier
//! pairs indexed by its L- and R-classes, the representative's H-class,
//! and lookup tables from λ- and ρ-orbit positions to class-internal
//! indices. Regular classes additionally carry per-side idempotent
//! representatives and the H-generators; non-regular classes carry
//! links (by [`DClassId`]) to the regular classes holding their left
//! and right identity idempotents.
//!
//! Everything that needs the orbits or the memo tables lives on the
//! engine; the methods here are pure element algebra.

use std::collections::{HashMap, HashSet};

use crate::element::MonoidElement;
use crate::konieczny::index::DClassId;

/// Data shared by regular and non-regular D-classes.
#[derive(Debug)]
pub(crate) struct DClassData<E> {
    pub(crate) rep: E,
    pub(crate) rank: usize,
    pub(crate) h_class: Vec<E>,
    pub(crate) h_set: HashSet<E>,
    pub(crate) left_mults: Vec<E>,
    pub(crate) left_mults_inv: Vec<E>,
    pub(crate) left_reps: Vec<E>,
    pub(crate) right_mults: Vec<E>,
    pub(crate) right_mults_inv: Vec<E>,
    pub(crate) right_reps: Vec<E>,
}

/// A regular D-class: every element has an idempotent in its R-class
/// and its L-class; the representative itself is idempotent.
#[derive(Debug)]
pub struct RegularDClass<E> {
    pub(crate) data: DClassData<E>,
    pub(crate) h_gens: Vec<E>,
    /// λ-orbit indices of the L-classes, in λ-SCC member order.
    pub(crate) left_indices: Vec<usize>,
    /// ρ-orbit indices of the R-classes, in ρ-SCC member order.
    pub(crate) right_indices: Vec<usize>,
    pub(crate) left_idem_reps: Vec<E>,
    pub(crate) right_idem_reps: Vec<E>,
    /// λ-orbit position → L-index within this class.
    pub(crate) lambda_positions: HashMap<usize, usize>,
    /// ρ-orbit position → R-index within this class.
    pub(crate) rho_positions: HashMap<usize, usize>,
}

/// A non-regular D-class.
#[derive(Debug)]
pub struct NonRegularDClass<E> {
    pub(crate) data: DClassData<E>,
    pub(crate) left_idem_above: E,
    pub(crate) right_idem_above: E,
    /// The regular class containing `left_idem_above`.
    pub(crate) left_idem_class: DClassId,
    /// The regular class containing `right_idem_above`.
    pub(crate) right_idem_class: DClassId,
    /// λ-orbit position → L-indices (several L-classes may share a λ).
    pub(crate) lambda_positions: HashMap<usize, Vec<usize>>,
    /// ρ-orbit position → R-indices.
    pub(crate) rho_positions: HashMap<usize, Vec<usize>>,
}

/// A D-class of the decomposition, regular or not.
#[derive(Debug)]
pub enum DClass<E> {
    /// A class whose elements are regular.
    Regular(RegularDClass<E>),
    /// A class without idempotents.
    NonRegular(NonRegularDClass<E>),
}

impl<E: MonoidElement> DClassData<E> {
    /// Translate `x` (with class-internal indices `i`, `j`) into the
    /// representative's H-class and test membership there.
    fn h_translate_contains(&self, x: &E, i: usize, j: usize) -> bool {
        let y = E::product_of(&self.right_mults_inv[j], x, 0);
        self.h_set.contains(&E::product_of(&y, &self.left_mults_inv[i], 0))
    }
}

impl<E: MonoidElement> RegularDClass<E> {
    /// The L- and R-indices of an element known to lie in this class.
    pub(crate) fn index_positions(&self, lpos: usize, rpos: usize) -> Option<(usize, usize)> {
        Some((
            *self.lambda_positions.get(&lpos)?,
            *self.rho_positions.get(&rpos)?,
        ))
    }

    fn contains_at(&self, x: &E, lpos: usize, rpos: usize) -> bool {
        match self.index_positions(lpos, rpos) {
            // Coordinates alone admit impostors from outside the
            // semigroup, so verify in the representative's H-class.
            Some((i, j)) => self.data.h_translate_contains(x, i, j),
            None => false,
        }
    }

    /// The idempotent representatives of the L-classes.
    pub fn left_idem_reps(&self) -> &[E] {
        &self.left_idem_reps
    }

    /// The idempotent representatives of the R-classes.
    pub fn right_idem_reps(&self) -> &[E] {
        &self.right_idem_reps
    }

    /// Generators of the representative's H-class.
    pub fn h_gens(&self) -> &[E] {
        &self.h_gens
    }

    /// λ-orbit indices of the L-classes.
    pub fn left_indices(&self) -> &[usize] {
        &self.left_indices
    }

    /// ρ-orbit indices of the R-classes.
    pub fn right_indices(&self) -> &[usize] {
        &self.right_indices
    }
}

impl<E: MonoidElement> NonRegularDClass<E> {
    fn contains_at(&self, x: &E, lpos: usize, rpos: usize) -> bool {
        let Some(lefts) = self.lambda_positions.get(&lpos) else {
            return false;
        };
        let Some(rights) = self.rho_positions.get(&rpos) else {
            return false;
        };
        lefts.iter().any(|&i| {
            rights
                .iter()
                .any(|&j| self.data.h_translate_contains(x, i, j))
        })
    }

    /// The left identity idempotent located above this class.
    pub fn left_idem_above(&self) -> &E {
        &self.left_idem_above
    }

    /// The right identity idempotent located above this class.
    pub fn right_idem_above(&self) -> &E {
        &self.right_idem_above
    }

    /// The regular class containing the left identity idempotent.
    pub fn left_idem_class(&self) -> DClassId {
        self.left_idem_class
    }

    /// The regular class containing the right identity idempotent.
    pub fn right_idem_class(&self) -> DClassId {
        self.right_idem_class
    }
}

impl<E: MonoidElement> DClass<E> {
    pub(crate) fn data(&self) -> &DClassData<E> {
        match self {
            DClass::Regular(d) => &d.data,
            DClass::NonRegular(d) => &d.data,
        }
    }

    /// The class representative.
    pub fn rep(&self) -> &E {
        &self.data().rep
    }

    /// The rank shared by every member of the class.
    pub fn rank(&self) -> usize {
        self.data().rank
    }

    /// Whether the class is regular.
    pub fn is_regular(&self) -> bool {
        matches!(self, DClass::Regular(_))
    }

    /// Number of elements in the class: `|H| · |L| · |R|`.
    pub fn size(&self) -> u64 {
        let d = self.data();
        d.h_class.len() as u64 * d.left_reps.len() as u64 * d.right_reps.len() as u64
    }

    /// Number of L-classes.
    pub fn number_of_l_classes(&self) -> usize {
        self.data().left_reps.len()
    }

    /// Number of R-classes.
    pub fn number_of_r_classes(&self) -> usize {
        self.data().right_reps.len()
    }

    /// The representative's H-class.
    pub fn h_class(&self) -> &[E] {
        &self.data().h_class
    }

    /// One representative per L-class, in class-index order.
    pub fn left_reps(&self) -> &[E] {
        &self.data().left_reps
    }

    /// One representative per R-class, in class-index order.
    pub fn right_reps(&self) -> &[E] {
        &self.data().right_reps
    }

    /// The left multipliers, indexed like [`left_reps`](Self::left_reps).
    pub fn left_mults(&self) -> &[E] {
        &self.data().left_mults
    }

    /// The right multipliers, indexed like
    /// [`right_reps`](Self::right_reps).
    pub fn right_mults(&self) -> &[E] {
        &self.data().right_mults
    }

    /// Membership test given the argument's λ- and ρ-orbit positions.
    pub(crate) fn contains_at(&self, x: &E, lpos: usize, rpos: usize) -> bool {
        match self {
            DClass::Regular(d) => d.contains_at(x, lpos, rpos),
            DClass::NonRegular(d) => d.contains_at(x, lpos, rpos),
        }
    }
}
