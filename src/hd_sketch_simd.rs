//! SIMD HD sketch has the same contract and estimation formula as
//! [`HdSketch`](crate::hd_sketch::HdSketch) but stores every bucket as one
//! cache-line [`PackedBucket`] of 32 `i16` lanes and runs insert and estimate
//! through vectorized kernels (see [`crate::simd`]).
//!
//! The projection vector uses the inverted bit convention of
//! [`PackedBucket::from_hash`]. For the same seeds and insert sequence every
//! bucket holds the negation of the matching `HdSketch<K, i16>` bucket, and the
//! estimates are equal.
//!
//! Lanes wrap on overflow: a bucket absorbs up to 32767 inserts per lane
//! direction before estimates silently degrade.

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::mem::{size_of, size_of_val};

use bytemuck::{bytes_of, NoUninit};
use rand::Rng;

use crate::error::SketchError;
use crate::hash::hash32;
use crate::simd::{Backend, Kernel, PackedBucket, LANES};

pub struct HdSketchSimd<K> {
    buckets: Box<[PackedBucket]>,
    index_seed: u32,
    projection_seed: u32,
    kernel: Kernel,
    _key: PhantomData<fn(&K)>,
}

impl<K: NoUninit> HdSketchSimd<K> {
    /// Creates new sketch with `size` zeroed buckets using the fastest kernel
    /// available on this CPU.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn new<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        Self::build(size, rng, Backend::detect())
    }

    /// Creates new sketch forcing kernel `backend`.
    pub fn with_backend<R: Rng + ?Sized>(
        size: usize,
        rng: &mut R,
        backend: Backend,
    ) -> Result<Self, SketchError> {
        if size == 0 {
            return Err(SketchError::ZeroCapacity("size"));
        }
        if !backend.is_supported() {
            return Err(SketchError::UnsupportedBackend(backend));
        }
        Ok(Self::build(size, rng, backend))
    }

    fn build<R: Rng + ?Sized>(size: usize, rng: &mut R, backend: Backend) -> Self {
        assert!(size > 0, "hd sketch size must be non-zero");

        let index_seed = rng.gen();
        let projection_seed = rng.gen();
        let sketch = Self {
            buckets: vec![PackedBucket::ZERO; size].into_boxed_slice(),
            index_seed,
            projection_seed,
            kernel: Kernel::new(backend),
            _key: PhantomData,
        };
        tracing::debug!(
            size,
            bytes = sketch.size_of(),
            backend = ?sketch.backend(),
            "created simd hd sketch"
        );
        sketch
    }

    /// Insert `key` by adding its projection vector to its bucket lane-wise
    #[inline]
    pub fn insert(&mut self, key: &K) {
        self.insert_bytes(bytes_of(key))
    }

    /// Return estimated number of insertions of `key`
    #[inline]
    pub fn estimate(&self, key: &K) -> f64 {
        self.estimate_bytes(bytes_of(key))
    }

    /// Return kernel backend in use
    #[inline]
    pub fn backend(&self) -> Backend {
        self.kernel.backend()
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

    /// Return bucket `idx`
    #[inline]
    pub fn bucket(&self, idx: usize) -> &PackedBucket {
        &self.buckets[idx]
    }

    /// Return memory size of `HdSketchSimd`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(&*self.buckets)
    }

    #[inline]
    pub(crate) fn insert_bytes(&mut self, key: &[u8]) {
        let idx = self.index(key);
        let h = self.project(key);
        self.kernel.superpose(&mut self.buckets[idx], h);
    }

    #[inline]
    pub(crate) fn estimate_bytes(&self, key: &[u8]) -> f64 {
        let dot = self.kernel.dot(&self.buckets[self.index(key)], self.project(key));
        f64::from(dot) / LANES as f64
    }

    #[inline]
    fn index(&self, key: &[u8]) -> usize {
        hash32(key, self.index_seed) as usize % self.buckets.len()
    }

    #[inline]
    fn project(&self, key: &[u8]) -> u32 {
        hash32(key, self.projection_seed)
    }
}

impl<K: NoUninit> Debug for HdSketchSimd<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ size: {}, bytes: {}, backend: {:?} }}",
            self.size(),
            self.size_of(),
            self.backend()
        )
    }
}
