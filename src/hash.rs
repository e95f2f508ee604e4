//! Hash primitives shared by all sketches.
//!
//! - [`hash32`] is the seeded 32-bit mixing function: every row of the seeded
//!   Count-Min Sketch and both hashes of the HD sketches go through it.
//! - [`signature`] is the seed-independent djb2 signature consumed by the
//!   modulo (universal hashing) Count-Min strategy.

use wyhash::wyhash;

/// Initial state of the djb2 signature
const DJB2_INIT: u32 = 5381;

/// Hash `bytes` with `seed` into a uniformly distributed 32-bit value.
///
/// Built on 64-bit wyhash with both halves folded together, so every output
/// bit depends on the whole 64-bit mix.
#[inline]
pub fn hash32(bytes: &[u8], seed: u32) -> u32 {
    let h = wyhash(bytes, u64::from(seed));
    (h ^ (h >> 32)) as u32
}

/// Rolling multiplicative (djb2) signature of `bytes`
#[inline]
pub fn signature(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB2_INIT, |sig, &b| {
        sig.wrapping_shl(5)
            .wrapping_add(sig)
            .wrapping_add(u32::from(b))
    })
}
