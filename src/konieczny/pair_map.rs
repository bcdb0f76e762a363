//! Hash maps keyed on pairs of small integers.
//!
//! The group-index memo tables are keyed on
//! `(ρ-orbit position, λ-SCC id)` pairs (or their swap). A splat hash,
//! the sum of both halves plus the 64-bit golden-ratio constant, is
//! adequate for these dense, small keys.

use std::hash::{BuildHasherDefault, Hasher};

use hashbrown::HashMap;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c16;

/// Sums the written words with a golden-ratio offset.
#[derive(Default, Clone)]
pub struct PairSplatHasher {
    state: u64,
}

impl Hasher for PairSplatHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.state = self.state.wrapping_add(u64::from_le_bytes(buf));
        }
    }

    #[inline]
    fn write_u64(&mut self, v: u64) {
        self.state = self.state.wrapping_add(v);
    }

    #[inline]
    fn write_usize(&mut self, v: usize) {
        self.state = self.state.wrapping_add(v as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.state.wrapping_add(GOLDEN_GAMMA)
    }
}

/// A map keyed on `(u64, u64)` with the pair-splat hasher.
pub type PairMap<V> = HashMap<(u64, u64), V, BuildHasherDefault<PairSplatHasher>>;

/// The key for a `(ρ-position, λ-SCC)`-style pair.
#[inline]
pub fn pair_key(a: usize, b: usize) -> (u64, u64) {
    (a as u64, b as u64)
}
