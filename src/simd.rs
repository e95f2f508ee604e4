//! Packed 32-lane buckets and the vectorized kernels that update and query them.
//!
//! ## Packed bucket
//! A [`PackedBucket`] is one 64-byte cache line holding 32 signed 16-bit lanes.
//! It is the unit of storage of [`HdSketchSimd`](crate::hd_sketch_simd::HdSketchSimd)
//! and maps one-to-one onto an AVX-512 register (or two AVX2 registers).
//!
//! Lane layout:
//! - lanes 0..15   - components driven by bits 0..15 of the projection hash
//! - lanes 16..31  - components driven by bits 16..31 of the projection hash
//!
//! Projection convention: lane `i` of a key's vector is `-1` when bit `i` of
//! its projection hash is set and `+1` when it is clear. This is the negation
//! of [`Hv32::from_hash`](crate::hypervector::Hv32::from_hash); estimates are
//! unaffected because both insert and estimate use the same convention.
//!
//! ## Kernels
//! Two operations are vectorized:
//! - superpose: `bucket += vector(h)` with wrapping 16-bit lane adds,
//! - dot: `sum(bucket[i] * vector(h)[i])` via pairwise multiply-add into
//!   32-bit lanes followed by a horizontal sum.
//!
//! Kernels are picked once per sketch from runtime CPU detection:
//! AVX-512BW, then AVX2, then a portable scalar loop. All three produce
//! bit-identical results.

use std::fmt::{Debug, Formatter};

/// Number of 16-bit lanes per bucket
pub const LANES: usize = 32;
/// Bucket size in bytes
pub const BUCKET_BYTES: usize = 64;

/// 32 lanes of `i16`, aligned to a cache line
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C, align(64))]
pub struct PackedBucket([i16; LANES]);

/// Single-bit selector per lane: `1 << (i % 16)`
const SELECTORS: PackedBucket = PackedBucket(selector_lanes());

const fn selector_lanes() -> [i16; LANES] {
    let mut lanes = [0i16; LANES];
    let mut i = 0;
    while i < LANES {
        lanes[i] = (1u16 << (i % 16)) as i16;
        i += 1;
    }
    lanes
}

impl PackedBucket {
    pub const ZERO: Self = Self([0; LANES]);

    /// Build projection vector of hash `h` (bit set gives `-1`, clear gives `+1`)
    #[inline]
    pub fn from_hash(h: u32) -> Self {
        let mut lanes = [0i16; LANES];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = if h & (1 << i) != 0 { -1 } else { 1 };
        }
        Self(lanes)
    }

    /// Return lanes
    #[inline]
    pub fn lanes(&self) -> &[i16; LANES] {
        &self.0
    }
}

impl Default for PackedBucket {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[i16; LANES]> for PackedBucket {
    fn from(lanes: [i16; LANES]) -> Self {
        Self(lanes)
    }
}

impl Debug for PackedBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Instruction set used by bucket kernels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// AVX-512F + AVX-512BW: one 512-bit register per bucket
    Avx512,
    /// AVX2: two 256-bit registers per bucket
    Avx2,
    /// Scalar loop, available everywhere
    Portable,
}

impl Backend {
    /// Return fastest backend supported by this CPU
    pub fn detect() -> Self {
        [Backend::Avx512, Backend::Avx2]
            .into_iter()
            .find(|b| b.is_supported())
            .unwrap_or(Backend::Portable)
    }

    /// Return whether this CPU can run the backend
    pub fn is_supported(self) -> bool {
        match self {
            #[cfg(target_arch = "x86_64")]
            Backend::Avx512 => {
                is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw")
            }
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => is_x86_feature_detected!("avx2"),
            #[cfg(not(target_arch = "x86_64"))]
            Backend::Avx512 | Backend::Avx2 => false,
            Backend::Portable => true,
        }
    }
}

/// Bucket kernels resolved for one backend
#[derive(Clone, Copy)]
pub(crate) struct Kernel {
    backend: Backend,
    superpose: fn(&mut PackedBucket, u32),
    dot: fn(&PackedBucket, u32) -> i32,
}

impl Kernel {
    /// Resolve kernels for `backend`; caller must have checked `backend.is_supported()`.
    pub(crate) fn new(backend: Backend) -> Self {
        debug_assert!(backend.is_supported());
        match backend {
            #[cfg(target_arch = "x86_64")]
            Backend::Avx512 => Self {
                backend,
                superpose: x86::superpose_avx512_safe,
                dot: x86::dot_avx512_safe,
            },
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => Self {
                backend,
                superpose: x86::superpose_avx2_safe,
                dot: x86::dot_avx2_safe,
            },
            _ => Self {
                backend: Backend::Portable,
                superpose: superpose_portable,
                dot: dot_portable,
            },
        }
    }

    #[inline]
    pub(crate) fn backend(&self) -> Backend {
        self.backend
    }

    #[inline]
    pub(crate) fn superpose(&self, bucket: &mut PackedBucket, h: u32) {
        (self.superpose)(bucket, h)
    }

    #[inline]
    pub(crate) fn dot(&self, bucket: &PackedBucket, h: u32) -> i32 {
        (self.dot)(bucket, h)
    }
}

impl Debug for Kernel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Kernel({:?})", self.backend)
    }
}

/// Scalar superposition with wrapping lane adds
fn superpose_portable(bucket: &mut PackedBucket, h: u32) {
    let query = PackedBucket::from_hash(h);
    for (lane, q) in bucket.0.iter_mut().zip(query.0) {
        *lane = lane.wrapping_add(q);
    }
}

/// Scalar dot product in 32-bit lanes
fn dot_portable(bucket: &PackedBucket, h: u32) -> i32 {
    let query = PackedBucket::from_hash(h);
    bucket
        .0
        .iter()
        .zip(query.0)
        .map(|(&b, q)| i32::from(b) * i32::from(q))
        .fold(0, i32::wrapping_add)
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;
    use std::mem::transmute;

    use super::{PackedBucket, SELECTORS};

    /// Lanes 16..31 of a 512-bit register
    const UPPER_LANES: __mmask32 = 0xffff_0000;

    pub(super) fn superpose_avx512_safe(bucket: &mut PackedBucket, h: u32) {
        // SAFETY: only reachable through a `Kernel` built after AVX-512 detection.
        unsafe { superpose_avx512(bucket, h) }
    }

    pub(super) fn dot_avx512_safe(bucket: &PackedBucket, h: u32) -> i32 {
        // SAFETY: only reachable through a `Kernel` built after AVX-512 detection.
        unsafe { dot_avx512(bucket, h) }
    }

    pub(super) fn superpose_avx2_safe(bucket: &mut PackedBucket, h: u32) {
        // SAFETY: only reachable through a `Kernel` built after AVX2 detection.
        unsafe { superpose_avx2(bucket, h) }
    }

    pub(super) fn dot_avx2_safe(bucket: &PackedBucket, h: u32) -> i32 {
        // SAFETY: only reachable through a `Kernel` built after AVX2 detection.
        unsafe { dot_avx2(bucket, h) }
    }

    /// Broadcast low/high hash halves, test each lane's bit and blend to -1 / +1.
    #[target_feature(enable = "avx512f,avx512bw")]
    #[inline]
    unsafe fn hash_to_vec_avx512(h: u32) -> __m512i {
        let selectors: __m512i = transmute(SELECTORS);
        let vec = _mm512_set1_epi16(h as u16 as i16);
        let vec = _mm512_mask_set1_epi16(vec, UPPER_LANES, (h >> 16) as u16 as i16);
        let vec = _mm512_and_si512(selectors, vec);
        let clear = _mm512_cmpeq_epi16_mask(vec, _mm512_setzero_si512());
        _mm512_mask_blend_epi16(clear, _mm512_set1_epi16(-1), _mm512_set1_epi16(1))
    }

    #[target_feature(enable = "avx512f,avx512bw")]
    unsafe fn superpose_avx512(bucket: &mut PackedBucket, h: u32) {
        let lanes: __m512i = transmute(*bucket);
        *bucket = transmute(_mm512_add_epi16(lanes, hash_to_vec_avx512(h)));
    }

    #[target_feature(enable = "avx512f,avx512bw")]
    unsafe fn dot_avx512(bucket: &PackedBucket, h: u32) -> i32 {
        let lanes: __m512i = transmute(*bucket);
        let prod = _mm512_madd_epi16(lanes, hash_to_vec_avx512(h));
        _mm512_reduce_add_epi32(prod)
    }

    /// Same as the AVX-512 conversion, one 16-lane half per register.
    #[target_feature(enable = "avx2")]
    #[inline]
    unsafe fn hash_to_vec_avx2(h: u32) -> [__m256i; 2] {
        let [selectors, _]: [__m256i; 2] = transmute(SELECTORS);
        [
            half_to_vec_avx2(selectors, h as u16),
            half_to_vec_avx2(selectors, (h >> 16) as u16),
        ]
    }

    #[target_feature(enable = "avx2")]
    #[inline]
    unsafe fn half_to_vec_avx2(selectors: __m256i, bits: u16) -> __m256i {
        let vec = _mm256_and_si256(selectors, _mm256_set1_epi16(bits as i16));
        let clear = _mm256_cmpeq_epi16(vec, _mm256_setzero_si256());
        _mm256_blendv_epi8(_mm256_set1_epi16(-1), _mm256_set1_epi16(1), clear)
    }

    #[target_feature(enable = "avx2")]
    unsafe fn superpose_avx2(bucket: &mut PackedBucket, h: u32) {
        let [lo, hi]: [__m256i; 2] = transmute(*bucket);
        let [q_lo, q_hi] = hash_to_vec_avx2(h);
        let sum = [_mm256_add_epi16(lo, q_lo), _mm256_add_epi16(hi, q_hi)];
        *bucket = transmute(sum);
    }

    #[target_feature(enable = "avx2")]
    unsafe fn dot_avx2(bucket: &PackedBucket, h: u32) -> i32 {
        let [lo, hi]: [__m256i; 2] = transmute(*bucket);
        let [q_lo, q_hi] = hash_to_vec_avx2(h);
        let prod = _mm256_add_epi32(_mm256_madd_epi16(lo, q_lo), _mm256_madd_epi16(hi, q_hi));
        let prod: [i32; 8] = transmute(prod);
        prod.into_iter().fold(0, i32::wrapping_add)
    }
}
