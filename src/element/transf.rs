//! Transformations of a finite set, with their λ- and ρ-invariants.
//!
//! A *transformation* of degree `n` is a total map on `{0, …, n−1}`,
//! stored as the vector of images. Products compose left-to-right:
//! `(x · y)(i) = y(x(i))`.
//!
//! The λ-value of a transformation is its image set, kept as a 64-bit
//! bitset ([`ImageSet`]); the ρ-value is its kernel partition in
//! canonical first-occurrence numbering ([`Kernel`]). The bitset caps
//! the usable degree at 64 for decomposition purposes; requesting a
//! λ-value beyond that signals
//! [`DegreeOutOfRange`](KoniecznyError::DegreeOutOfRange).

use std::fmt;

use crate::element::MonoidElement;
use crate::error::KoniecznyError;
use crate::orbit::action::{Action, OnTuples};

/// Largest degree representable at all (images are stored as `u8`).
pub const MAX_DEGREE: usize = 256;

/// A set of points `{0, …, 63}` stored as a 64-bit bitset.
///
/// Used as the λ-value of a [`Transformation`]; the fixed width is what
/// bounds the engine's working degree.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageSet(u64);

impl ImageSet {
    /// Number of points an `ImageSet` can hold.
    pub const CAPACITY: usize = 64;

    /// The empty set.
    #[inline]
    pub fn new() -> Self {
        Self(0)
    }

    /// Insert point `i`.
    #[inline]
    pub fn insert(&mut self, i: usize) {
        debug_assert!(i < Self::CAPACITY);
        self.0 |= 1 << i;
    }

    /// Whether point `i` is present.
    #[inline]
    pub fn contains(&self, i: usize) -> bool {
        i < Self::CAPACITY && self.0 >> i & 1 == 1
    }

    /// Remove every point.
    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Cardinality of the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The raw bit pattern.
    #[inline]
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Iterate over the members in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                None
            } else {
                let i = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(i)
            }
        })
    }
}

impl FromIterator<usize> for ImageSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut out = Self::new();
        for i in iter {
            out.insert(i);
        }
        out
    }
}

impl fmt::Debug for ImageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The kernel of a transformation in canonical form.
///
/// `classes[i]` is the index of the kernel class of point `i`; classes
/// are numbered by first occurrence, so two transformations have equal
/// kernels iff their `Kernel`s are equal.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kernel {
    classes: Vec<u8>,
}

impl Kernel {
    /// The class index of point `i`.
    #[inline]
    pub fn class_of(&self, i: usize) -> usize {
        self.classes[i] as usize
    }

    /// The degree of the underlying transformation.
    #[inline]
    pub fn degree(&self) -> usize {
        self.classes.len()
    }

    /// The number of kernel classes.
    pub fn number_of_classes(&self) -> usize {
        self.classes.iter().max().map_or(0, |&m| m as usize + 1)
    }

    /// The canonical class vector.
    #[inline]
    pub fn classes(&self) -> &[u8] {
        &self.classes
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kernel({:?})", self.classes)
    }
}

/// A total map on `{0, …, n−1}`, stored as its image vector.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transformation {
    images: Vec<u8>,
}

impl Transformation {
    /// Create a transformation from its image vector.
    ///
    /// Fails with [`KoniecznyError::InvalidImage`] if any image value is
    /// not below the degree, and with
    /// [`KoniecznyError::DegreeOutOfRange`] if the degree exceeds
    /// [`MAX_DEGREE`].
    pub fn new(images: Vec<u8>) -> Result<Self, KoniecznyError> {
        if images.len() > MAX_DEGREE {
            return Err(KoniecznyError::DegreeOutOfRange {
                degree: images.len(),
                max: MAX_DEGREE,
            });
        }
        for &v in &images {
            if v as usize >= images.len() {
                return Err(KoniecznyError::InvalidImage {
                    value: v as usize,
                    degree: images.len(),
                });
            }
        }
        Ok(Self { images })
    }

    /// Convenience constructor from an image list.
    ///
    /// ```
    /// use konieczny::element::Transformation;
    /// let x = Transformation::from_images([1, 0, 2]).unwrap();
    /// assert_eq!(x.image(0), 1);
    /// ```
    pub fn from_images<I: IntoIterator<Item = u8>>(images: I) -> Result<Self, KoniecznyError> {
        Self::new(images.into_iter().collect())
    }

    /// The image of point `i`.
    #[inline]
    pub fn image(&self, i: usize) -> usize {
        self.images[i] as usize
    }

    /// The raw image vector.
    #[inline]
    pub fn images(&self) -> &[u8] {
        &self.images
    }
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T({:?})", self.images)
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.images)
    }
}

impl MonoidElement for Transformation {
    type Lambda = ImageSet;
    type Rho = Kernel;

    fn product(dst: &mut Self, x: &Self, y: &Self, _tid: usize) {
        debug_assert_eq!(x.degree(), y.degree());
        dst.images.clear();
        dst.images
            .extend(x.images.iter().map(|&i| y.images[i as usize]));
    }

    fn identity_of_degree(n: usize) -> Result<Self, KoniecznyError> {
        if n > MAX_DEGREE {
            return Err(KoniecznyError::DegreeOutOfRange {
                degree: n,
                max: MAX_DEGREE,
            });
        }
        Ok(Self {
            images: (0..n).map(|i| i as u8).collect(),
        })
    }

    #[inline]
    fn degree(&self) -> usize {
        self.images.len()
    }

    fn rank(&self) -> usize {
        let mut seen = [0u64; 4];
        let mut r = 0;
        for &v in &self.images {
            let (w, b) = (v as usize / 64, v as usize % 64);
            if seen[w] >> b & 1 == 0 {
                seen[w] |= 1 << b;
                r += 1;
            }
        }
        r
    }

    fn is_unit(&self) -> bool {
        !self.images.is_empty() && self.rank() == self.degree()
    }

    fn lambda_value(&self, dst: &mut ImageSet) -> Result<(), KoniecznyError> {
        if self.degree() > ImageSet::CAPACITY {
            return Err(KoniecznyError::DegreeOutOfRange {
                degree: self.degree(),
                max: ImageSet::CAPACITY,
            });
        }
        dst.clear();
        for &v in &self.images {
            dst.insert(v as usize);
        }
        Ok(())
    }

    fn rho_value(&self, dst: &mut Kernel) -> Result<(), KoniecznyError> {
        dst.classes.clear();
        let mut relabel = [u16::MAX; MAX_DEGREE];
        let mut next: u16 = 0;
        for &v in &self.images {
            let slot = &mut relabel[v as usize];
            if *slot == u16::MAX {
                *slot = next;
                next += 1;
            }
            dst.classes.push(*slot as u8);
        }
        Ok(())
    }

    fn lambda_action(dst: &mut ImageSet, pt: &ImageSet, x: &Self) {
        dst.clear();
        for i in pt.iter() {
            dst.insert(x.images[i] as usize);
        }
    }

    fn rho_action(dst: &mut Kernel, pt: &Kernel, x: &Self) {
        dst.classes.clear();
        let mut relabel = [u16::MAX; MAX_DEGREE];
        let mut next: u16 = 0;
        for &v in &x.images {
            let c = pt.classes[v as usize] as usize;
            let slot = &mut relabel[c];
            if *slot == u16::MAX {
                *slot = next;
                next += 1;
            }
            dst.classes.push(*slot as u8);
        }
    }

    fn is_group_h_class(rho: &Kernel, lambda: &ImageSet) -> bool {
        // The image must be a transversal of the kernel: one image point
        // in every kernel class.
        if lambda.len() != rho.number_of_classes() {
            return false;
        }
        let mut seen = [0u64; 4];
        for i in lambda.iter() {
            if i >= rho.degree() {
                return false;
            }
            let c = rho.classes[i] as usize;
            let (w, b) = (c / 64, c % 64);
            if seen[w] >> b & 1 == 1 {
                return false;
            }
            seen[w] |= 1 << b;
        }
        true
    }
}

/// Right action of transformations on ordered tuples of points.
///
/// Unlike the λ-action this does not sort or deduplicate: `{0, 1}` and
/// `{1, 0}` are distinct points.
impl Action<Transformation> for OnTuples {
    type Point = Vec<u8>;

    fn apply(dst: &mut Vec<u8>, pt: &Vec<u8>, x: &Transformation) {
        dst.clear();
        dst.extend(pt.iter().map(|&i| x.images[i as usize]));
    }

    fn chain(dst: &mut Transformation, first: &Transformation, then: &Transformation, tid: usize) {
        Transformation::product(dst, first, then, tid);
    }
}
