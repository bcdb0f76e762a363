//! `DClassId`: a strong, zero-cost handle for D-classes.
//!
//! D-classes live in an arena owned by the engine and refer to each
//! other by dense index, never by pointer. `DClassId` wraps the index
//! so that parent references, the D-relation edge lists, and the
//! non-regular classes' links to their idempotent-carrying regular
//! classes cannot be confused with other integers.

use std::fmt;

use crate::error::KoniecznyError;

/// Index of a D-class in the engine's arena, in discovery order.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct DClassId(u32);

impl DClassId {
    /// Wrap a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw index as a `usize`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<usize> for DClassId {
    type Error = KoniecznyError;

    fn try_from(raw: usize) -> Result<Self, KoniecznyError> {
        u32::try_from(raw)
            .map(DClassId)
            .map_err(|_| KoniecznyError::Invariant(format!("D-class index {raw} overflows u32")))
    }
}

impl From<DClassId> for usize {
    #[inline]
    fn from(id: DClassId) -> usize {
        id.index()
    }
}

impl fmt::Debug for DClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DClassId").field(&self.0).finish()
    }
}

impl fmt::Display for DClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    // If this fails, the repr(transparent) guarantee is broken.
    assert_eq_size!(DClassId, u32);

    #[test]
    fn alignment_matches_u32() {
        assert_eq_align!(DClassId, u32);
    }

    #[test]
    fn round_trips() {
        let id = DClassId::try_from(17usize).unwrap();
        assert_eq!(id.index(), 17);
        assert_eq!(usize::from(id), 17);
        assert_eq!(format!("{id}"), "17");
        assert_eq!(format!("{id:?}"), "DClassId(17)");
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(DClassId::try_from(u32::MAX as usize + 1).is_err());
    }

    #[test]
    fn serde_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let id = DClassId::new(123);
        let s = serde_json::to_string(&id)?;
        let back: DClassId = serde_json::from_str(&s)?;
        assert_eq!(back, id);
        let bytes = bincode::serialize(&id)?;
        let back2: DClassId = bincode::deserialize(&bytes)?;
        assert_eq!(back2, id);
        Ok(())
    }
}
