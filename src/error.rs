//! Error types returned by fallible constructors.
//!
//! Insert and estimate operations never fail: once a sketch exists, every
//! operation is a total function of its state and the key.

use thiserror::Error;

use crate::simd::Backend;

/// Sketch construction error
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SketchError {
    /// A capacity parameter (`width`, `height` or `size`) was zero.
    #[error("sketch {0} must be non-zero")]
    ZeroCapacity(&'static str),
    /// An error bound passed to [`crate::count_min::Dimensions::from_error_bounds`] is outside (0, 1).
    #[error("error bound {name} = {value} must lie in (0, 1)")]
    InvalidErrorBound { name: &'static str, value: f64 },
    /// Load factor used for equal-memory sizing is not a finite positive number.
    #[error("load factor must be finite and positive, got {0}")]
    InvalidLoadFactor(f64),
    /// The requested SIMD kernel cannot run on this CPU.
    #[error("{0:?} kernel is not supported on this CPU")]
    UnsupportedBackend(Backend),
}

/// Sequence loading error
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("failed to read sequence: {0}")]
    Io(#[from] std::io::Error),
    #[error("sequence contains no bases")]
    Empty,
}
