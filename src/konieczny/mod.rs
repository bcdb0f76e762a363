//! Konieczny's D-class decomposition.
//!
//! The engine never materialises a multiplication table. It runs the
//! λ-orbit (right action on images) and the ρ-orbit (left action on
//! kernels) to completion, then stratifies the semigroup by rank: the
//! identity's D-class is seeded first, and every class's *covering
//! representatives* (one-generator extensions of its side
//! representatives) feed a rank-partitioned worklist. Each candidate is
//! either absorbed by a known class or opens a new one: regular when a
//! *group index* exists in its λ-SCC, non-regular otherwise.
//!
//! ```
//! use konieczny::element::Transformation;
//! use konieczny::Konieczny;
//!
//! let s = Konieczny::new(vec![
//!     Transformation::from_images([1, 0, 2]).unwrap(),
//!     Transformation::from_images([0, 0, 2]).unwrap(),
//! ])
//! .unwrap();
//! assert!(s.contains(&Transformation::from_images([0, 0, 2]).unwrap()));
//! ```

pub mod dclass;
pub mod index;
pub mod pair_map;

pub use dclass::{DClass, NonRegularDClass, RegularDClass};
pub use index::DClassId;
pub use pair_map::{pair_key, PairMap};

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::OnceCell;

use crate::cache::{CacheGuard, ElementCache};
use crate::element::MonoidElement;
use crate::error::KoniecznyError;
use crate::invariants::{AuditInvariants, InvariantReport};
use crate::orbit::{OnImages, OnKernels, Orbit};

use dclass::DClassData;

/// The Green's-relation decomposition of `⟨gens⟩`.
///
/// Construction runs to completion; all queries afterwards are
/// read-only (memo tables and the element cache use interior
/// mutability). D-classes are arena-owned and iterate in discovery
/// order: the identity's class first, then by decreasing rank of the
/// seeding representative.
#[derive(Debug)]
pub struct Konieczny<E: MonoidElement> {
    gens: Vec<E>,
    degree: usize,
    identity: E,
    identity_adjoined: bool,
    lambda_orb: Orbit<E, OnImages>,
    rho_orb: Orbit<E, OnKernels>,
    d_classes: Vec<DClass<E>>,
    regular_classes: Vec<DClassId>,
    /// `d_rels[i]` holds classes known to lie above class `i`; an
    /// incidental record of the D-order, acyclic by construction.
    d_rels: Vec<Vec<DClassId>>,
    group_indices: RefCell<PairMap<Option<usize>>>,
    group_indices_alt: RefCell<PairMap<Option<usize>>>,
    cache: RefCell<ElementCache<E>>,
    size: OnceCell<u64>,
    idempotents: OnceCell<u64>,
}

impl<E: MonoidElement> Konieczny<E> {
    /// Decompose the semigroup generated by `generators`.
    ///
    /// Fails with [`KoniecznyError::EmptyGenerators`] on an empty
    /// input, [`KoniecznyError::MixedGeneratorDegrees`] when the
    /// generators disagree on degree, and propagates
    /// [`KoniecznyError::DegreeOutOfRange`] from the conformance smoke
    /// test (λ and ρ of the identity). A failed construction leaves no
    /// partial state.
    pub fn new(generators: Vec<E>) -> Result<Self, KoniecznyError> {
        let degree = generators
            .first()
            .map(MonoidElement::degree)
            .ok_or(KoniecznyError::EmptyGenerators)?;
        for g in &generators {
            if g.degree() != degree {
                return Err(KoniecznyError::MixedGeneratorDegrees {
                    expected: degree,
                    found: g.degree(),
                });
            }
        }
        let identity = E::identity_of_degree(degree)?;
        // Conformance smoke test: λ and ρ of the identity must be
        // representable at this degree.
        let id_lambda = E::lambda_of(&identity)?;
        let id_rho = E::rho_of(&identity)?;

        let mut gens = generators;
        let identity_adjoined = !gens.iter().any(MonoidElement::is_unit);
        if identity_adjoined {
            gens.push(identity.clone());
        }

        let mut lambda_orb = Orbit::new();
        lambda_orb.add_seed(id_lambda);
        let mut rho_orb = Orbit::new();
        rho_orb.add_seed(id_rho);
        for g in &gens {
            lambda_orb.add_generator(g.clone())?;
            rho_orb.add_generator(g.clone())?;
        }
        lambda_orb.run()?;
        rho_orb.run()?;
        log::debug!(
            "λ-orbit: {} points, ρ-orbit: {} points",
            lambda_orb.len(),
            rho_orb.len()
        );

        let mut cache = ElementCache::new();
        cache.push(&identity, 4);

        let mut this = Self {
            gens,
            degree,
            identity,
            identity_adjoined,
            lambda_orb,
            rho_orb,
            d_classes: Vec::new(),
            regular_classes: Vec::new(),
            d_rels: Vec::new(),
            group_indices: RefCell::new(PairMap::default()),
            group_indices_alt: RefCell::new(PairMap::default()),
            cache: RefCell::new(cache),
            size: OnceCell::new(),
            idempotents: OnceCell::new(),
        };
        this.compute_d_classes()?;
        crate::audit_invariants!(this, "decomposition");
        Ok(this)
    }

    //////////////////////////////////////////////////////////////////
    // Products
    //////////////////////////////////////////////////////////////////

    fn prod(&self, x: &E, y: &E) -> E {
        E::product_of(x, y, 0)
    }

    /// `x · y · z` with the intermediate written into cache scratch.
    fn prod3(&self, x: &E, y: &E, z: &E) -> Result<E, KoniecznyError> {
        let mut tmp = CacheGuard::new(&self.cache)?;
        E::product(&mut tmp, x, y, 0);
        Ok(E::product_of(&tmp, z, 0))
    }

    //////////////////////////////////////////////////////////////////
    // Group-index search
    //////////////////////////////////////////////////////////////////

    /// The group index for the coordinate pair
    /// `(ρ-orbit position, λ-SCC)`: the first λ-SCC member whose
    /// H-class against `rpos` is a group. Memoised.
    fn group_index_at(&self, rpos: usize, lscc: usize) -> Result<Option<usize>, KoniecznyError> {
        let key = pair_key(rpos, lscc);
        if let Some(&v) = self.group_indices.borrow().get(&key) {
            return Ok(v);
        }
        let rv = self.rho_orb.at(rpos);
        let found = self
            .lambda_orb
            .scc_members(lscc)?
            .iter()
            .copied()
            .find(|&j| E::is_group_h_class(rv, self.lambda_orb.at(j)));
        self.group_indices.borrow_mut().insert(key, found);
        Ok(found)
    }

    /// The symmetric search: the first ρ-SCC member forming a group
    /// H-class against λ-orbit position `lpos`. Memoised.
    fn group_index_alt_at(&self, rscc: usize, lpos: usize) -> Result<Option<usize>, KoniecznyError> {
        let key = pair_key(rscc, lpos);
        if let Some(&v) = self.group_indices_alt.borrow().get(&key) {
            return Ok(v);
        }
        let lv = self.lambda_orb.at(lpos);
        let found = self
            .rho_orb
            .scc_members(rscc)?
            .iter()
            .copied()
            .find(|&j| E::is_group_h_class(self.rho_orb.at(j), lv));
        self.group_indices_alt.borrow_mut().insert(key, found);
        Ok(found)
    }

    /// Find a group index of an H-class in the R-class of `x`, if any.
    pub fn find_group_index(&self, x: &E) -> Result<Option<usize>, KoniecznyError> {
        let lv = E::lambda_of(x)?;
        let rv = E::rho_of(x)?;
        let (Some(lpos), Some(rpos)) = (
            self.lambda_orb.position(&lv),
            self.rho_orb.position(&rv),
        ) else {
            return Ok(None);
        };
        let lscc = self.lambda_orb.scc_id(lpos)?;
        self.group_index_at(rpos, lscc)
    }

    /// Whether `x` is a regular element of the semigroup.
    pub fn is_regular_element(&self, x: &E) -> Result<bool, KoniecznyError> {
        Ok(self.find_group_index(x)?.is_some())
    }

    //////////////////////////////////////////////////////////////////
    // Idempotents
    //////////////////////////////////////////////////////////////////

    /// The unique idempotent among the powers of `x`.
    fn idempotent_power(&self, x: &E) -> Result<E, KoniecznyError> {
        let mut tmp = x.clone();
        let mut scratch = CacheGuard::new(&self.cache)?;
        loop {
            E::product(&mut scratch, &tmp, &tmp, 0);
            if *scratch == tmp {
                return Ok(tmp);
            }
            E::product(&mut scratch, &tmp, x, 0);
            std::mem::swap(&mut tmp, &mut *scratch);
        }
    }

    /// The inverse of `x` in the group with identity `id`.
    fn group_inverse(&self, id: &E, x: &E) -> Result<E, KoniecznyError> {
        let mut tmp = x.clone();
        let mut scratch = CacheGuard::new(&self.cache)?;
        loop {
            let y = tmp.clone();
            E::product(&mut scratch, x, &y, 0);
            std::mem::swap(&mut tmp, &mut *scratch);
            if tmp == *id {
                return Ok(y);
            }
        }
    }

    /// An idempotent in the D-class of `x`, or `None` when `x` is not
    /// regular.
    pub fn find_idempotent(&self, x: &E) -> Result<Option<E>, KoniecznyError> {
        if E::is_idempotent(x) {
            return Ok(Some(x.clone()));
        }
        let Some(i) = self.find_group_index(x)? else {
            return Ok(None);
        };
        let lv = E::lambda_of(x)?;
        let lpos = self
            .lambda_orb
            .position(&lv)
            .ok_or_else(|| KoniecznyError::Invariant("regular element left the λ-orbit".into()))?;
        let y = self.prod3(
            x,
            self.lambda_orb.multiplier_to_scc_root(lpos)?,
            self.lambda_orb.multiplier_from_scc_root(i)?,
        )?;
        Ok(Some(self.idempotent_power(&y)?))
    }

    //////////////////////////////////////////////////////////////////
    // Regular D-class construction
    //////////////////////////////////////////////////////////////////

    fn make_regular_class(&self, idem_rep: E) -> Result<RegularDClass<E>, KoniecznyError> {
        if !E::is_idempotent(&idem_rep) {
            return Err(KoniecznyError::Invariant(
                "regular D-class representative must be idempotent".into(),
            ));
        }
        let rank = idem_rep.rank();
        let invariant =
            |what: &str| KoniecznyError::Invariant(format!("regular class: {what}"));
        let lpos = self
            .lambda_orb
            .position(&E::lambda_of(&idem_rep)?)
            .ok_or_else(|| invariant("representative's λ is not in the orbit"))?;
        let rpos = self
            .rho_orb
            .position(&E::rho_of(&idem_rep)?)
            .ok_or_else(|| invariant("representative's ρ is not in the orbit"))?;
        let lscc = self.lambda_orb.scc_id(lpos)?;
        let rscc = self.rho_orb.scc_id(rpos)?;

        // L-classes: λ-SCC members admitting a group coordinate against
        // the ρ-SCC. The search loops the ρ-SCC, hence the "alt" table.
        let mut left_indices = Vec::new();
        let mut lambda_positions = HashMap::new();
        for &i in self.lambda_orb.scc_members(lscc)? {
            if self.group_index_alt_at(rscc, i)?.is_some() {
                lambda_positions.insert(i, left_indices.len());
                left_indices.push(i);
            }
        }

        // R-classes: ρ-SCC members whose translate of the
        // representative is regular.
        let mut right_indices = Vec::new();
        let mut rho_positions = HashMap::new();
        for &j in self.rho_orb.scc_members(rscc)? {
            let x = self.prod3(
                self.rho_orb.multiplier_from_scc_root(j)?,
                self.rho_orb.multiplier_to_scc_root(rpos)?,
                &idem_rep,
            )?;
            if self.find_group_index(&x)?.is_some() {
                rho_positions.insert(j, right_indices.len());
                right_indices.push(j);
            }
        }

        // Multiplier pairs along the SCC roots.
        let mut left_mults = Vec::with_capacity(left_indices.len());
        let mut left_mults_inv = Vec::with_capacity(left_indices.len());
        for &i in &left_indices {
            left_mults.push(self.prod(
                self.lambda_orb.multiplier_to_scc_root(lpos)?,
                self.lambda_orb.multiplier_from_scc_root(i)?,
            ));
            left_mults_inv.push(self.prod(
                self.lambda_orb.multiplier_to_scc_root(i)?,
                self.lambda_orb.multiplier_from_scc_root(lpos)?,
            ));
        }
        let mut right_mults = Vec::with_capacity(right_indices.len());
        let mut right_mults_inv = Vec::with_capacity(right_indices.len());
        for &j in &right_indices {
            right_mults.push(self.prod(
                self.rho_orb.multiplier_from_scc_root(j)?,
                self.rho_orb.multiplier_to_scc_root(rpos)?,
            ));
            right_mults_inv.push(self.prod(
                self.rho_orb.multiplier_from_scc_root(rpos)?,
                self.rho_orb.multiplier_to_scc_root(j)?,
            ));
        }

        let left_reps: Vec<E> = left_mults.iter().map(|b| self.prod(&idem_rep, b)).collect();
        let right_reps: Vec<E> = right_mults.iter().map(|c| self.prod(c, &idem_rep)).collect();

        // Idempotent representatives per side, via the group identity
        // reached by powering.
        let mut left_idem_reps = Vec::with_capacity(left_indices.len());
        for (i_idx, &i) in left_indices.iter().enumerate() {
            let k = self
                .group_index_alt_at(rscc, i)?
                .ok_or_else(|| invariant("admitted L-index lost its group coordinate"))?;
            let j_idx = right_indices
                .iter()
                .position(|&r| r == k)
                .ok_or_else(|| invariant("group coordinate is not an R-index"))?;
            let x = self.prod3(&right_mults[j_idx], &idem_rep, &left_mults[i_idx])?;
            left_idem_reps.push(self.idempotent_power(&x)?);
        }
        let mut right_idem_reps = Vec::with_capacity(right_indices.len());
        for (j_idx, &j) in right_indices.iter().enumerate() {
            let k = self
                .group_index_at(j, lscc)?
                .ok_or_else(|| invariant("admitted R-index lost its group index"))?;
            let i_idx = left_indices
                .iter()
                .position(|&l| l == k)
                .ok_or_else(|| invariant("group index is not an L-index"))?;
            let x = self.prod3(&right_mults[j_idx], &idem_rep, &left_mults[i_idx])?;
            right_idem_reps.push(self.idempotent_power(&x)?);
        }

        // H-class generators: close each left representative by a
        // generator, then pull back into the representative's H-class
        // with the pre-computed right inverses.
        let mut right_invs = Vec::with_capacity(left_indices.len());
        for (i_idx, &i) in left_indices.iter().enumerate() {
            let k = self
                .group_index_alt_at(rscc, i)?
                .ok_or_else(|| invariant("admitted L-index lost its group coordinate"))?;
            let j_idx = *rho_positions
                .get(&k)
                .ok_or_else(|| invariant("group coordinate is not an R-index"))?;
            let p = &left_reps[i_idx];
            let q = &right_reps[j_idx];
            let y = self.group_inverse(&idem_rep, &self.prod(p, q))?;
            right_invs.push(self.prod(q, &y));
        }
        let mut h_gens = Vec::new();
        let mut h_gen_set = HashSet::new();
        for p in &left_reps {
            for g in &self.gens {
                let x = self.prod(p, g);
                let Some(spos) = self.lambda_orb.position(&E::lambda_of(&x)?) else {
                    continue;
                };
                if let Some(&j) = lambda_positions.get(&spos) {
                    let h = self.prod(&x, &right_invs[j]);
                    if h_gen_set.insert(h.clone()) {
                        h_gens.push(h);
                    }
                }
            }
        }

        // The H-class is the closure of its generators.
        let mut h_class: Vec<E> = h_gens.clone();
        let mut h_set: HashSet<E> = h_class.iter().cloned().collect();
        let mut at = 0;
        while at < h_class.len() {
            for g in &h_gens {
                let y = self.prod(&h_class[at], g);
                if h_set.insert(y.clone()) {
                    h_class.push(y);
                }
            }
            at += 1;
        }

        Ok(RegularDClass {
            data: DClassData {
                rep: idem_rep,
                rank,
                h_class,
                h_set,
                left_mults,
                left_mults_inv,
                left_reps,
                right_mults,
                right_mults_inv,
                right_reps,
            },
            h_gens,
            left_indices,
            right_indices,
            left_idem_reps,
            right_idem_reps,
            lambda_positions,
            rho_positions,
        })
    }

    //////////////////////////////////////////////////////////////////
    // Non-regular D-class construction
    //////////////////////////////////////////////////////////////////

    fn make_non_regular_class(&self, rep: E) -> Result<NonRegularDClass<E>, KoniecznyError> {
        if E::is_idempotent(&rep) {
            return Err(KoniecznyError::Invariant(
                "non-regular D-class representative must not be idempotent".into(),
            ));
        }
        let rank = rep.rank();
        let invariant =
            |what: &str| KoniecznyError::Invariant(format!("non-regular class: {what}"));

        // Locate identity idempotents in previously built regular
        // classes, latest first: the representative lies in the ideals
        // they generate.
        let mut left_found: Option<(E, DClassId)> = None;
        let mut right_found: Option<(E, DClassId)> = None;
        for &rid in self.regular_classes.iter().rev() {
            let DClass::Regular(d) = &self.d_classes[rid.index()] else {
                return Err(invariant("regular index points at a non-regular class"));
            };
            if left_found.is_none() {
                for e in &d.left_idem_reps {
                    if self.prod(&rep, e) == rep {
                        left_found = Some((e.clone(), rid));
                        break;
                    }
                }
            }
            if right_found.is_none() {
                for e in &d.right_idem_reps {
                    if self.prod(e, &rep) == rep {
                        right_found = Some((e.clone(), rid));
                        break;
                    }
                }
            }
            if left_found.is_some() && right_found.is_some() {
                break;
            }
        }
        let (left_idem_above, left_id) =
            left_found.ok_or_else(|| invariant("no left identity idempotent above"))?;
        let (right_idem_above, right_id) =
            right_found.ok_or_else(|| invariant("no right identity idempotent above"))?;

        let DClass::Regular(left_class) = &self.d_classes[left_id.index()] else {
            return Err(invariant("left idempotent class is not regular"));
        };
        let DClass::Regular(right_class) = &self.d_classes[right_id.index()] else {
            return Err(invariant("right idempotent class is not regular"));
        };

        // The idempotents' coordinates inside their own classes.
        let (li, lj) = {
            let lpos = self
                .lambda_orb
                .position(&E::lambda_of(&left_idem_above)?)
                .ok_or_else(|| invariant("left idempotent's λ is not in the orbit"))?;
            let rpos = self
                .rho_orb
                .position(&E::rho_of(&left_idem_above)?)
                .ok_or_else(|| invariant("left idempotent's ρ is not in the orbit"))?;
            left_class
                .index_positions(lpos, rpos)
                .ok_or_else(|| invariant("left idempotent missing from its class"))?
        };
        let (ri, rj) = {
            let lpos = self
                .lambda_orb
                .position(&E::lambda_of(&right_idem_above)?)
                .ok_or_else(|| invariant("right idempotent's λ is not in the orbit"))?;
            let rpos = self
                .rho_orb
                .position(&E::rho_of(&right_idem_above)?)
                .ok_or_else(|| invariant("right idempotent's ρ is not in the orbit"))?;
            right_class
                .index_positions(lpos, rpos)
                .ok_or_else(|| invariant("right idempotent missing from its class"))?
        };
        let left_idem_left_mult = &left_class.data.left_mults[li];
        let left_idem_right_mult = &left_class.data.right_mults[lj];
        let right_idem_left_mult = &right_class.data.left_mults[ri];
        let right_idem_right_mult = &right_class.data.right_mults[rj];

        // The idempotents' H-classes, translated to their coordinates.
        let mut left_idem_h = Vec::with_capacity(left_class.data.h_class.len());
        for h in &left_class.data.h_class {
            left_idem_h.push(self.prod3(left_idem_right_mult, h, left_idem_left_mult)?);
        }
        let mut right_idem_h = Vec::with_capacity(right_class.data.h_class.len());
        for h in &right_class.data.h_class {
            right_idem_h.push(self.prod3(right_idem_right_mult, h, right_idem_left_mult)?);
        }

        let mut left_idem_left_reps = Vec::with_capacity(left_class.data.left_mults.len());
        for m in &left_class.data.left_mults {
            left_idem_left_reps.push(self.prod3(left_idem_right_mult, &left_class.data.rep, m)?);
        }
        let mut right_idem_right_reps = Vec::with_capacity(right_class.data.right_mults.len());
        for m in &right_class.data.right_mults {
            right_idem_right_reps.push(self.prod3(m, &right_class.data.rep, right_idem_left_mult)?);
        }

        // H-class of the representative: the translates through the
        // right idempotent intersected with those through the left one.
        let mut hex: Vec<E> = right_idem_h.iter().map(|t| self.prod(t, &rep)).collect();
        let mut xhf: Vec<E> = left_idem_h.iter().map(|s| self.prod(&rep, s)).collect();
        hex.sort_unstable();
        hex.dedup();
        xhf.sort_unstable();
        xhf.dedup();
        let mut h_class = Vec::new();
        let (mut a, mut b) = (0, 0);
        while a < hex.len() && b < xhf.len() {
            use std::cmp::Ordering;
            match hex[a].cmp(&xhf[b]) {
                Ordering::Less => a += 1,
                Ordering::Greater => b += 1,
                Ordering::Equal => {
                    h_class.push(hex[a].clone());
                    a += 1;
                    b += 1;
                }
            }
        }
        let h_set: HashSet<E> = h_class.iter().cloned().collect();

        // Side representatives: one per distinct H-class coset.
        let mut left_reps = Vec::new();
        let mut left_mults = Vec::new();
        let mut left_mults_inv = Vec::new();
        let mut lambda_positions: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut seen_cosets: HashSet<Vec<E>> = HashSet::new();
        for h in &left_idem_h {
            for (i, w) in left_idem_left_reps.iter().enumerate() {
                let hw = self.prod(h, w);
                let mut coset: Vec<E> = h_class.iter().map(|s| self.prod(s, &hw)).collect();
                coset.sort_unstable();
                if !seen_cosets.insert(coset) {
                    continue;
                }
                let a = self.prod(&rep, &hw);
                let inv = self.prod(
                    &self.group_inverse(
                        &left_idem_above,
                        &self.prod3(w, &left_class.data.left_mults_inv[i], left_idem_left_mult)?,
                    )?,
                    &self.group_inverse(&left_idem_above, h)?,
                );
                let apos = self
                    .lambda_orb
                    .position(&E::lambda_of(&a)?)
                    .ok_or_else(|| invariant("left representative's λ is not in the orbit"))?;
                lambda_positions.entry(apos).or_default().push(left_reps.len());
                left_reps.push(a);
                left_mults.push(hw);
                left_mults_inv.push(self.prod3(
                    &left_class.data.left_mults_inv[i],
                    left_idem_left_mult,
                    &inv,
                )?);
            }
        }

        let mut right_reps = Vec::new();
        let mut right_mults = Vec::new();
        let mut right_mults_inv = Vec::new();
        let mut rho_positions: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut seen_cosets: HashSet<Vec<E>> = HashSet::new();
        for h in &right_idem_h {
            for (i, z) in right_idem_right_reps.iter().enumerate() {
                let zh = self.prod(z, h);
                let mut coset: Vec<E> = h_class.iter().map(|s| self.prod(&zh, s)).collect();
                coset.sort_unstable();
                if !seen_cosets.insert(coset) {
                    continue;
                }
                let b = self.prod(&zh, &rep);
                let inv = self.prod(
                    &self.group_inverse(&right_idem_above, h)?,
                    &self.group_inverse(
                        &right_idem_above,
                        &self.prod3(
                            right_idem_right_mult,
                            &right_class.data.right_mults_inv[i],
                            z,
                        )?,
                    )?,
                );
                let bpos = self
                    .rho_orb
                    .position(&E::rho_of(&b)?)
                    .ok_or_else(|| invariant("right representative's ρ is not in the orbit"))?;
                rho_positions.entry(bpos).or_default().push(right_reps.len());
                right_reps.push(b);
                right_mults.push(zh);
                right_mults_inv.push(self.prod3(
                    &inv,
                    right_idem_right_mult,
                    &right_class.data.right_mults_inv[i],
                )?);
            }
        }

        Ok(NonRegularDClass {
            data: DClassData {
                rep,
                rank,
                h_class,
                h_set,
                left_mults,
                left_mults_inv,
                left_reps,
                right_mults,
                right_mults_inv,
                right_reps,
            },
            left_idem_above,
            right_idem_above,
            left_idem_class: left_id,
            right_idem_class: right_id,
            lambda_positions,
            rho_positions,
        })
    }

    //////////////////////////////////////////////////////////////////
    // Enumeration
    //////////////////////////////////////////////////////////////////

    fn push_class(&mut self, d: DClass<E>) -> Result<DClassId, KoniecznyError> {
        let id = DClassId::try_from(self.d_classes.len())?;
        if d.is_regular() {
            self.regular_classes.push(id);
        }
        self.d_classes.push(d);
        self.d_rels.push(Vec::new());
        Ok(id)
    }

    fn class_contains(&self, ci: usize, x: &E) -> Result<bool, KoniecznyError> {
        let Some(lpos) = self.lambda_orb.position(&E::lambda_of(x)?) else {
            return Ok(false);
        };
        let Some(rpos) = self.rho_orb.position(&E::rho_of(x)?) else {
            return Ok(false);
        };
        Ok(self.d_classes[ci].contains_at(x, lpos, rpos))
    }

    /// Candidate representatives below a class: its side
    /// representatives extended by one generator, minus what the class
    /// already contains. The smaller orbit picks the side.
    fn covering_reps(&self, ci: usize) -> Result<Vec<E>, KoniecznyError> {
        let data = self.d_classes[ci].data();
        let mut out = Vec::new();
        if self.lambda_orb.len() < self.rho_orb.len() {
            for w in &data.left_reps {
                for g in &self.gens {
                    let x = self.prod(w, g);
                    if !self.class_contains(ci, &x)? {
                        out.push(x);
                    }
                }
            }
        } else {
            for z in &data.right_reps {
                for g in &self.gens {
                    let x = self.prod(g, z);
                    if !self.class_contains(ci, &x)? {
                        out.push(x);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    fn dispatch_covering_reps(
        &mut self,
        id: DClassId,
        reg_reps: &mut [Vec<(E, DClassId)>],
        non_reg_reps: &mut [Vec<(E, DClassId)>],
        ranks: &mut BTreeSet<usize>,
    ) -> Result<(), KoniecznyError> {
        for x in self.covering_reps(id.index())? {
            let r = x.rank();
            ranks.insert(r);
            if self.is_regular_element(&x)? {
                reg_reps[r].push((x, id));
            } else {
                non_reg_reps[r].push((x, id));
            }
        }
        Ok(())
    }

    fn compute_d_classes(&mut self) -> Result<(), KoniecznyError> {
        let top_rank = self.identity.rank();
        let mut reg_reps: Vec<Vec<(E, DClassId)>> = vec![Vec::new(); top_rank + 1];
        let mut non_reg_reps: Vec<Vec<(E, DClassId)>> = vec![Vec::new(); top_rank + 1];
        // Grade 0 stays in the set so the loop has a floor to stop at.
        let mut ranks: BTreeSet<usize> = BTreeSet::new();
        ranks.insert(0);

        let top = self.make_regular_class(self.identity.clone())?;
        let top_id = self.push_class(DClass::Regular(top))?;
        self.dispatch_covering_reps(top_id, &mut reg_reps, &mut non_reg_reps, &mut ranks)?;

        loop {
            let Some(&max_rank) = ranks.iter().next_back() else {
                break;
            };
            if max_rank == 0 {
                break;
            }
            // Regular candidates go first within a rank: non-regular
            // construction leans on the regular classes above it.
            let (batch, regular) = if !reg_reps[max_rank].is_empty() {
                (std::mem::take(&mut reg_reps[max_rank]), true)
            } else if !non_reg_reps[max_rank].is_empty() {
                (std::mem::take(&mut non_reg_reps[max_rank]), false)
            } else {
                ranks.remove(&max_rank);
                continue;
            };
            log::debug!(
                "rank {max_rank}: {} {} candidate(s)",
                batch.len(),
                if regular { "regular" } else { "non-regular" }
            );

            // Drop candidates a known class already holds, keeping the
            // D-order edge.
            let mut fresh = Vec::with_capacity(batch.len());
            'candidate: for (x, parent) in batch {
                for ci in 0..self.d_classes.len() {
                    if self.d_classes[ci].rank() == max_rank && self.class_contains(ci, &x)? {
                        self.d_rels[ci].push(parent);
                        continue 'candidate;
                    }
                }
                fresh.push((x, parent));
            }
            let mut batch = fresh;

            while let Some((x, parent)) = batch.pop() {
                let new_id = if regular {
                    let e = self.find_idempotent(&x)?.ok_or_else(|| {
                        KoniecznyError::Invariant(
                            "regular representative admits no idempotent".into(),
                        )
                    })?;
                    let d = self.make_regular_class(e)?;
                    self.push_class(DClass::Regular(d))?
                } else {
                    let d = self.make_non_regular_class(x)?;
                    self.push_class(DClass::NonRegular(d))?
                };
                self.d_rels[new_id.index()].push(parent);
                self.dispatch_covering_reps(new_id, &mut reg_reps, &mut non_reg_reps, &mut ranks)?;

                // Containment in the just-created class dominates the
                // rest of the batch.
                let mut kept = Vec::with_capacity(batch.len());
                for (y, p) in batch {
                    if self.class_contains(new_id.index(), &y)? {
                        self.d_rels[new_id.index()].push(p);
                    } else {
                        kept.push((y, p));
                    }
                }
                batch = kept;
            }
        }
        log::debug!(
            "{} D-classes, {} regular",
            self.d_classes.len(),
            self.regular_classes.len()
        );
        Ok(())
    }

    //////////////////////////////////////////////////////////////////
    // Queries
    //////////////////////////////////////////////////////////////////

    /// Whether `x` belongs to the semigroup.
    ///
    /// Exact for arbitrary elements of the ambient monoid; never an
    /// error.
    pub fn contains(&self, x: &E) -> bool {
        if x.degree() != self.degree {
            return false;
        }
        // An adjoined identity is not an element of the semigroup.
        if self.identity_adjoined && *x == self.identity {
            return false;
        }
        let rank = x.rank();
        (0..self.d_classes.len()).any(|ci| {
            self.d_classes[ci].rank() == rank
                && matches!(self.class_contains(ci, x), Ok(true))
        })
    }

    /// The D-class containing `x`, or `None` when `x` is not in the
    /// semigroup.
    pub fn d_class_of(&self, x: &E) -> Option<&DClass<E>> {
        self.d_class_id_of(x).map(|id| &self.d_classes[id.index()])
    }

    /// The index of the D-class containing `x`.
    pub fn d_class_id_of(&self, x: &E) -> Option<DClassId> {
        if x.degree() != self.degree {
            return None;
        }
        if self.identity_adjoined && *x == self.identity {
            return None;
        }
        let rank = x.rank();
        (0..self.d_classes.len())
            .find(|&ci| {
                self.d_classes[ci].rank() == rank
                    && matches!(self.class_contains(ci, x), Ok(true))
            })
            .and_then(|ci| DClassId::try_from(ci).ok())
    }

    /// Cardinality of the semigroup: `Σ |H|·|L|·|R|` over the classes,
    /// minus the adjoined identity's singleton when one was adjoined.
    pub fn size(&self) -> u64 {
        *self.size.get_or_init(|| {
            let total: u64 = self.d_classes.iter().map(DClass::size).sum();
            total - u64::from(self.identity_adjoined)
        })
    }

    /// Number of idempotents, summed over the regular classes. An
    /// adjoined identity is not counted.
    pub fn number_of_idempotents(&self) -> u64 {
        *self.idempotents.get_or_init(|| {
            let total: u64 = self
                .regular_classes
                .iter()
                .map(|&rid| match &self.d_classes[rid.index()] {
                    DClass::Regular(d) => self.count_idempotents(d),
                    DClass::NonRegular(_) => 0,
                })
                .sum();
            total - u64::from(self.identity_adjoined)
        })
    }

    /// Idempotents of one regular class: the group coordinates among
    /// its (L, R) index pairs.
    fn count_idempotents(&self, d: &RegularDClass<E>) -> u64 {
        let mut count = 0;
        for &i in &d.left_indices {
            for &j in &d.right_indices {
                if E::is_group_h_class(self.rho_orb.at(j), self.lambda_orb.at(i)) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Iterate over the D-classes of the semigroup in discovery order.
    ///
    /// An adjoined identity's singleton class is skipped; it is still
    /// reachable through [`d_class`](Self::d_class).
    pub fn d_classes(&self) -> impl Iterator<Item = &DClass<E>> {
        self.d_classes
            .iter()
            .skip(usize::from(self.identity_adjoined))
    }

    /// Iterate over the regular D-classes in discovery order, with the
    /// same skip as [`d_classes`](Self::d_classes).
    pub fn regular_d_classes(&self) -> impl Iterator<Item = &RegularDClass<E>> {
        self.regular_classes
            .iter()
            .skip(usize::from(self.identity_adjoined))
            .filter_map(|&rid| match &self.d_classes[rid.index()] {
                DClass::Regular(d) => Some(d),
                DClass::NonRegular(_) => None,
            })
    }

    /// The D-class at `id`.
    pub fn d_class(&self, id: DClassId) -> &DClass<E> {
        &self.d_classes[id.index()]
    }

    /// Classes recorded above class `id` in the D-order.
    pub fn d_classes_above(&self, id: DClassId) -> &[DClassId] {
        &self.d_rels[id.index()]
    }

    /// Number of D-classes of the semigroup.
    pub fn number_of_d_classes(&self) -> usize {
        self.d_classes.len() - usize::from(self.identity_adjoined)
    }

    /// Number of regular D-classes of the semigroup.
    pub fn number_of_regular_d_classes(&self) -> usize {
        self.regular_classes.len() - usize::from(self.identity_adjoined)
    }

    /// Number of L-classes of the semigroup.
    pub fn number_of_l_classes(&self) -> usize {
        let total: usize = self.d_classes.iter().map(DClass::number_of_l_classes).sum();
        total - usize::from(self.identity_adjoined)
    }

    /// Number of R-classes of the semigroup.
    pub fn number_of_r_classes(&self) -> usize {
        let total: usize = self.d_classes.iter().map(DClass::number_of_r_classes).sum();
        total - usize::from(self.identity_adjoined)
    }

    /// The working generators: the input list, plus the identity when
    /// none of the inputs was a unit.
    pub fn generators(&self) -> &[E] {
        &self.gens
    }

    /// The working degree.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Whether the identity had to be adjoined.
    pub fn identity_adjoined(&self) -> bool {
        self.identity_adjoined
    }

    /// The λ-orbit (right action on λ-values).
    pub fn lambda_orbit(&self) -> &Orbit<E, OnImages> {
        &self.lambda_orb
    }

    /// The ρ-orbit (left action on ρ-values).
    pub fn rho_orbit(&self) -> &Orbit<E, OnKernels> {
        &self.rho_orb
    }
}

impl<E: MonoidElement> AuditInvariants for Konieczny<E> {
    fn audit_invariants(&self, report: &mut InvariantReport) {
        for (ci, d) in self.d_classes.iter().enumerate() {
            report.require(d.rep().rank() == d.rank(), || {
                format!("class {ci}: representative rank mismatch")
            });
            for x in d.h_class() {
                report.require(x.rank() == d.rank(), || {
                    format!("class {ci}: H-class member of wrong rank")
                });
            }
            report.require(d.size() > 0, || format!("class {ci} is empty"));
            for &above in &self.d_rels[ci] {
                report.require(above.index() != ci, || {
                    format!("class {ci} is recorded above itself")
                });
                report.require(above.index() < self.d_classes.len(), || {
                    format!("class {ci} has a dangling D-order edge")
                });
            }
        }
    }
}
