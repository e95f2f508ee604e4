//! `hd-sketch` is a Rust crate of fixed-memory frequency sketches: structures that answer
//! "approximately how many times was this key inserted?" without storing the keys.
//!
//! Two families are provided:
//! - [`CountMinSketch`](count_min::CountMinSketch) with universal modulo hashing or a seeded
//!   mixing hash per row. Estimates never undercount.
//! - [`HdSketch`](hd_sketch::HdSketch) and its packed SIMD twin
//!   [`HdSketchSimd`](hd_sketch_simd::HdSketchSimd), which superpose bipolar hypervectors in a
//!   single row of 32-dimensional buckets and read counts back with a dot product. Estimates are
//!   unbiased and may fall on either side of the true count.
//!
//! All structures take keys as plain-old-data values (see [`bytemuck::NoUninit`]), draw their
//! hash parameters from a caller-supplied [`rand::Rng`], and are deterministic given the same
//! generator seed and insert sequence.
pub mod count_min;
pub mod error;
pub mod hash;
pub mod hd_sketch;
pub mod hd_sketch_simd;
pub mod hypervector;
pub mod kmer;
pub mod row_hash;
pub mod simd;
pub mod sketch;

pub use count_min::{CountMinSketch, Dimensions, ModuloCountMinSketch, SeededCountMinSketch};
pub use error::{SequenceError, SketchError};
pub use hd_sketch::HdSketch;
pub use hd_sketch_simd::HdSketchSimd;
pub use kmer::{Kmer128, PackedSequence};
pub use simd::Backend;
pub use sketch::{FrequencySketch, Sketch, SketchConfig};
