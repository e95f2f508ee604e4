//! Row hashing strategies for [`CountMinSketch`](crate::count_min::CountMinSketch).
//!
//! A strategy owns the per-row hash parameters drawn at construction and turns
//! the raw bytes of a key into one hash per row. The sketch reduces each hash
//! modulo its width to pick the row's column.
//!
//! - [`ModuloHashing`]: classic universal hashing `(a * sig + b) mod p` over a
//!   djb2 signature computed once per key.
//! - [`SeededHashing`]: the seeded mixing function applied to the full key once
//!   per row.

use std::mem::size_of_val;

use rand::Rng;

use crate::hash::{hash32, signature};

/// Prime modulus of the universal hash family (smallest prime above 2^32)
pub const LARGE_PRIME: u64 = 4_294_967_311;

/// Hashing strategy of a Count-Min Sketch, selected at compile time.
pub trait RowHashing: Sized {
    /// Draw parameters for `height` rows from `rng`
    fn with_rows<R: Rng + ?Sized>(height: usize, rng: &mut R) -> Self;

    /// Number of rows this strategy hashes for
    fn rows(&self) -> usize;

    /// One hash per row for `key`, in row order
    fn row_hashes<'a>(&'a self, key: &'a [u8]) -> impl Iterator<Item = u64> + 'a;

    /// Heap memory held by row parameters
    fn heap_size(&self) -> usize;
}

/// Universal hashing over the key's djb2 signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuloHashing {
    /// `(a, b)` per row, both in `[1, LARGE_PRIME)`
    params: Box<[(u64, u64)]>,
}

impl ModuloHashing {
    /// Return `(a, b)` parameters per row
    pub fn params(&self) -> &[(u64, u64)] {
        &self.params
    }

    /// Hash signature with row parameters, reducing the full sum modulo `LARGE_PRIME`.
    #[inline]
    fn universal(sig: u32, (a, b): (u64, u64)) -> u64 {
        let h = (u128::from(a) * u128::from(sig) + u128::from(b)) % u128::from(LARGE_PRIME);
        h as u64
    }
}

impl RowHashing for ModuloHashing {
    fn with_rows<R: Rng + ?Sized>(height: usize, rng: &mut R) -> Self {
        let params = (0..height)
            .map(|_| (rng.gen_range(1..LARGE_PRIME), rng.gen_range(1..LARGE_PRIME)))
            .collect();
        Self { params }
    }

    #[inline]
    fn rows(&self) -> usize {
        self.params.len()
    }

    #[inline]
    fn row_hashes<'a>(&'a self, key: &'a [u8]) -> impl Iterator<Item = u64> + 'a {
        let sig = signature(key);
        self.params.iter().map(move |&p| Self::universal(sig, p))
    }

    fn heap_size(&self) -> usize {
        size_of_val(&*self.params)
    }
}

/// Seeded mixing hash per row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededHashing {
    seeds: Box<[u32]>,
}

impl SeededHashing {
    /// Return seed per row
    pub fn seeds(&self) -> &[u32] {
        &self.seeds
    }
}

impl RowHashing for SeededHashing {
    fn with_rows<R: Rng + ?Sized>(height: usize, rng: &mut R) -> Self {
        let seeds = (0..height).map(|_| rng.gen()).collect();
        Self { seeds }
    }

    #[inline]
    fn rows(&self) -> usize {
        self.seeds.len()
    }

    #[inline]
    fn row_hashes<'a>(&'a self, key: &'a [u8]) -> impl Iterator<Item = u64> + 'a {
        self.seeds.iter().map(move |&seed| u64::from(hash32(key, seed)))
    }

    fn heap_size(&self) -> usize {
        size_of_val(&*self.seeds)
    }
}
