//! HD sketch is an approximate frequency table that resolves bucket
//! collisions with hyperdimensional superposition instead of exact bookkeeping.
//!
//! # Data-structure design rationale
//!
//! Every bucket is a 32-dimensional accumulator. Inserting a key adds the key's
//! bipolar projection vector (derived from a second, independent hash) to the
//! bucket its index hash selects. Estimating a key takes the dot product of the
//! bucket with the key's projection vector and divides by 32:
//! - each insertion of the key itself contributes exactly `32 / 32 = 1`,
//! - other keys sharing the bucket contribute zero-mean noise, because random
//!   bipolar vectors are nearly orthogonal; its magnitude grows with the square
//!   root of the bucket's occupancy.
//!
//! Memory is fixed at `size * 32` components, with no counter matrix and no
//! per-key state.
//!
//! Integer components wrap on overflow: an `i16` bucket absorbs up to 32767
//! inserts per component direction before estimates silently degrade. Wrapped
//! `i16` buckets stay the exact negation of the matching
//! [`HdSketchSimd`](crate::hd_sketch_simd::HdSketchSimd) buckets.

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::mem::{size_of, size_of_val};

use bytemuck::{bytes_of, NoUninit};
use rand::Rng;

use crate::hash::hash32;
use crate::hypervector::{Component, Hv32, HV32_DIM};

pub struct HdSketch<K, V = i16> {
    buckets: Box<[Hv32<V>]>,
    /// Seed of the bucket index hash
    index_seed: u32,
    /// Seed of the projection hash
    projection_seed: u32,
    _key: PhantomData<fn(&K)>,
}

impl<K: NoUninit, V: Component> HdSketch<K, V> {
    /// Creates new sketch with `size` zeroed buckets, drawing the index seed
    /// and then the projection seed from `rng`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn new<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        assert!(size > 0, "hd sketch size must be non-zero");

        let index_seed = rng.gen();
        let projection_seed = rng.gen();
        let sketch = Self {
            buckets: vec![Hv32::zero(); size].into_boxed_slice(),
            index_seed,
            projection_seed,
            _key: PhantomData,
        };
        tracing::debug!(size, bytes = sketch.size_of(), "created hd sketch");
        sketch
    }

    /// Insert `key` by superposing its projection vector onto its bucket
    #[inline]
    pub fn insert(&mut self, key: &K) {
        self.insert_bytes(bytes_of(key))
    }

    /// Return estimated number of insertions of `key`
    #[inline]
    pub fn estimate(&self, key: &K) -> f64 {
        self.estimate_bytes(bytes_of(key))
    }

    /// Return number of buckets
    #[inline]
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Return `(index_seed, projection_seed)`
    #[inline]
    pub fn seeds(&self) -> (u32, u32) {
        (self.index_seed, self.projection_seed)
    }

    /// Return accumulator of bucket `idx`
    #[inline]
    pub fn bucket(&self, idx: usize) -> &Hv32<V> {
        &self.buckets[idx]
    }

    /// Return memory size of `HdSketch`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(&*self.buckets)
    }

    #[inline]
    pub(crate) fn insert_bytes(&mut self, key: &[u8]) {
        let idx = self.index(key);
        self.buckets[idx] += Hv32::from_hash(self.project(key));
    }

    #[inline]
    pub(crate) fn estimate_bytes(&self, key: &[u8]) -> f64 {
        let query = Hv32::from_hash(self.project(key));
        self.buckets[self.index(key)].dot(&query) / HV32_DIM as f64
    }

    /// Bucket index of `key`
    #[inline]
    fn index(&self, key: &[u8]) -> usize {
        hash32(key, self.index_seed) as usize % self.buckets.len()
    }

    /// Projection hash of `key`
    #[inline]
    fn project(&self, key: &[u8]) -> u32 {
        hash32(key, self.projection_seed)
    }
}

impl<K: NoUninit, V: Component> Debug for HdSketch<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ size: {}, bytes: {} }}", self.size(), self.size_of())
    }
}
