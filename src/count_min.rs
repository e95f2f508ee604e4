//! Count-Min Sketch estimates how many times each key was inserted using a
//! `height x width` matrix of counters and one independent hash per row.
//!
//! # Data-structure design rationale
//!
//! ## One-sided error
//! Every insert increments one counter per row, so a counter holds the true
//! count of the key plus the counts of all keys colliding with it in that row.
//! Taking the minimum over rows can only overestimate, never underestimate.
//!
//! ## Conservative update
//! [`CountMinSketch::conservative_insert`] raises each row's counter only up to
//! `estimate + 1`, which keeps the same lower-bound guarantee while reducing
//! overcounting for colliding keys.
//!
//! ## Data storage format
//! Counters are stored in one contiguous `Box<[T]>` where row `i`, column `j`
//! lives at `i * width + j`. Row hash parameters live in the hashing strategy
//! `H`, which is chosen at compile time so the hot path has no dynamic dispatch.
//!
//! ## Capacity
//! Counter overflow is not detected: increments wrap. Pick a counter type
//! wide enough for the expected maximum per-key count.

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::mem::{size_of, size_of_val};

use bytemuck::{bytes_of, NoUninit};
use rand::Rng;

use crate::error::SketchError;
use crate::row_hash::{ModuloHashing, RowHashing, SeededHashing};

/// Count-Min Sketch using universal `(a * sig + b) mod p` row hashing
pub type ModuloCountMinSketch<K, T = u32> = CountMinSketch<K, T, ModuloHashing>;
/// Count-Min Sketch using the seeded mixing hash per row
pub type SeededCountMinSketch<K, T = u32> = CountMinSketch<K, T, SeededHashing>;

/// Counter stored in a Count-Min Sketch cell
pub trait Counter: Copy + Ord + Default + Debug {
    const MAX: Self;

    /// Add one, wrapping on overflow
    fn increment(self) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! impl_counter {
    ($($t:ty => |$v:ident| $conv:expr;)*) => {$(
        impl Counter for $t {
            const MAX: Self = <$t>::MAX;

            #[inline]
            fn increment(self) -> Self {
                self.wrapping_add(1)
            }

            #[inline]
            fn to_f64(self) -> f64 {
                let $v = self;
                $conv
            }
        }
    )*};
}

impl_counter! {
    u8 => |v| f64::from(v);
    u16 => |v| f64::from(v);
    u32 => |v| f64::from(v);
    u64 => |v| v as f64;
    i8 => |v| f64::from(v);
    i16 => |v| f64::from(v);
    i32 => |v| f64::from(v);
    i64 => |v| v as f64;
}

/// Largest counter matrix a slice can index
const MAX_COUNTERS: usize = isize::MAX as usize;

/// Counter matrix dimensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    /// Size a sketch so that, with probability `1 - delta`, an estimate exceeds
    /// the true count by at most `epsilon` times the total number of inserts.
    ///
    /// `width = ceil(e / epsilon)` and `height = ceil(ln(1 / delta))`.
    ///
    /// An `epsilon` so small that the `width * height` counter matrix cannot be
    /// addressed is rejected as invalid.
    pub fn from_error_bounds(epsilon: f64, delta: f64) -> Result<Self, SketchError> {
        for (name, value) in [("epsilon", epsilon), ("delta", delta)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(SketchError::InvalidErrorBound { name, value });
            }
        }
        let height = ((1.0 / delta).ln().ceil() as usize).max(1);
        let width = (std::f64::consts::E / epsilon).ceil();
        if width >= MAX_COUNTERS as f64
            || (width as usize)
                .checked_mul(height)
                .map_or(true, |cells| cells > MAX_COUNTERS)
        {
            return Err(SketchError::InvalidErrorBound {
                name: "epsilon",
                value: epsilon,
            });
        }
        Ok(Self {
            width: width as usize,
            height,
        })
    }
}

pub struct CountMinSketch<K, T, H> {
    width: usize,
    height: usize,
    /// Row-major `height * width` counters
    counters: Box<[T]>,
    hashing: H,
    _key: PhantomData<fn(&K)>,
}

impl<K: NoUninit, T: Counter, H: RowHashing> CountMinSketch<K, T, H> {
    /// Creates new sketch with `height` rows of `width` counters, drawing row
    /// hash parameters from `rng`.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    pub fn new<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Self {
        assert!(width > 0, "count-min sketch width must be non-zero");
        assert!(height > 0, "count-min sketch height must be non-zero");

        let sketch = Self {
            width,
            height,
            counters: vec![T::default(); width * height].into_boxed_slice(),
            hashing: H::with_rows(height, rng),
            _key: PhantomData,
        };
        tracing::debug!(width, height, size = sketch.size_of(), "created count-min sketch");
        sketch
    }

    /// Creates new sketch with the given dimensions
    pub fn with_dimensions<R: Rng + ?Sized>(dims: Dimensions, rng: &mut R) -> Self {
        Self::new(dims.width, dims.height, rng)
    }

    /// Return estimated number of insertions of `key`
    #[inline]
    pub fn estimate(&self, key: &K) -> T {
        self.estimate_bytes(bytes_of(key))
    }

    /// Increment the counter `key` hashes to in every row
    #[inline]
    pub fn insert(&mut self, key: &K) {
        self.insert_bytes(bytes_of(key))
    }

    /// Raise the counter `key` hashes to in every row to at least `estimate + 1`
    #[inline]
    pub fn conservative_insert(&mut self, key: &K) {
        self.conservative_insert_bytes(bytes_of(key))
    }

    /// Return number of counters per row
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Return number of rows
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Return hashing strategy with its row parameters
    #[inline]
    pub fn hashing(&self) -> &H {
        &self.hashing
    }

    /// Return counters of row `i`
    ///
    /// # Panics
    ///
    /// Panics if `i >= height`.
    pub fn row(&self, i: usize) -> &[T] {
        &self.counters[i * self.width..(i + 1) * self.width]
    }

    /// Return memory size of `CountMinSketch`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(&*self.counters) + self.hashing.heap_size()
    }

    #[inline]
    pub(crate) fn estimate_bytes(&self, key: &[u8]) -> T {
        cells(&self.hashing, self.width, key)
            .map(|idx| self.counters[idx])
            .min()
            .unwrap_or(T::MAX)
    }

    #[inline]
    pub(crate) fn insert_bytes(&mut self, key: &[u8]) {
        for idx in cells(&self.hashing, self.width, key) {
            let c = &mut self.counters[idx];
            *c = c.increment();
        }
    }

    #[inline]
    pub(crate) fn conservative_insert_bytes(&mut self, key: &[u8]) {
        let new_value = self.estimate_bytes(key).increment();
        for idx in cells(&self.hashing, self.width, key) {
            let c = &mut self.counters[idx];
            if *c < new_value {
                *c = new_value;
            }
        }
    }
}

impl<K, T, H: PartialEq> PartialEq for CountMinSketch<K, T, H>
where
    T: PartialEq,
{
    /// Compare dimensions, hash parameters and counters
    fn eq(&self, rhs: &Self) -> bool {
        self.width == rhs.width
            && self.height == rhs.height
            && self.hashing == rhs.hashing
            && self.counters == rhs.counters
    }
}

impl<K: NoUninit, T: Counter, H: RowHashing> Debug for CountMinSketch<K, T, H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ width: {}, height: {}, size: {} }}",
            self.width,
            self.height,
            self.size_of()
        )
    }
}

/// Flat counter index for each row `key` hashes to.
///
/// Takes the strategy and width instead of the sketch so callers can hold
/// a mutable borrow of the counters at the same time.
#[inline]
fn cells<'a, H: RowHashing>(
    hashing: &'a H,
    width: usize,
    key: &'a [u8],
) -> impl Iterator<Item = usize> + 'a {
    hashing
        .row_hashes(key)
        .enumerate()
        .map(move |(row, h)| row * width + (h % width as u64) as usize)
}
