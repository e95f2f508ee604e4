//! Fixed-dimension hypervectors and the algebra used by the HD sketch.
//!
//! A [`Hypervector`] is a plain `[T; D]` with elementwise arithmetic:
//! - `+`, `-` and their in-place forms for superposition (integer components
//!   wrap on overflow),
//! - `*` between two vectors for binding (Hadamard product),
//! - `*=` by a scalar,
//! - [`Hypervector::dot`], [`Hypervector::l1norm`] and [`Hypervector::l2norm`],
//!   all reduced in `f64` whatever the component type.
//!
//! Bipolar vectors (every component `+1` or `-1`) come from two constructors:
//! [`Hypervector::random_bipolar`] draws them from a caller-owned generator and
//! [`Hv32::from_hash`] maps the bits of a 32-bit hash onto 32 components.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Index, Mul, MulAssign, Sub, SubAssign};

use rand::Rng;

/// Dimension of hash-derived hypervectors
pub const HV32_DIM: usize = 32;

/// 32-dimensional hypervector built from a 32-bit hash
pub type Hv32<T> = Hypervector<T, HV32_DIM>;

/// Numeric component of a [`Hypervector`]
pub trait Component:
    Copy
    + Default
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    const ONE: Self;
    const MINUS_ONE: Self;

    /// Add without overflow checks; integers wrap around at the type's bounds
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Subtract without overflow checks; integers wrap around at the type's bounds
    fn wrapping_sub(self, rhs: Self) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! impl_component {
    (float: $($t:ty => |$v:ident| $conv:expr;)*) => {$(
        impl Component for $t {
            const ONE: Self = 1.0;
            const MINUS_ONE: Self = -1.0;

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline]
            fn wrapping_sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline]
            fn to_f64(self) -> f64 {
                let $v = self;
                $conv
            }
        }
    )*};
    ($($t:ty => $one:expr, $minus_one:expr, |$v:ident| $conv:expr;)*) => {$(
        impl Component for $t {
            const ONE: Self = $one;
            const MINUS_ONE: Self = $minus_one;

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$t>::wrapping_add(self, rhs)
            }

            #[inline]
            fn wrapping_sub(self, rhs: Self) -> Self {
                <$t>::wrapping_sub(self, rhs)
            }

            #[inline]
            fn to_f64(self) -> f64 {
                let $v = self;
                $conv
            }
        }
    )*};
}

impl_component! {
    i8 => 1, -1, |v| f64::from(v);
    i16 => 1, -1, |v| f64::from(v);
    i32 => 1, -1, |v| f64::from(v);
    i64 => 1, -1, |v| v as f64;
}

impl_component! {
    float:
    f32 => |v| f64::from(v);
    f64 => |v| v;
}

#[derive(Clone, Copy, PartialEq)]
pub struct Hypervector<T, const D: usize> {
    components: [T; D],
}

impl<T: Component, const D: usize> Hypervector<T, D> {
    /// Create all-zero hypervector
    #[inline]
    pub fn zero() -> Self {
        Self {
            components: [T::default(); D],
        }
    }

    /// Create random bipolar hypervector.
    ///
    /// Each component draws a uniform value in (-1, 1) and keeps only its sign.
    /// Reproducibility is the caller's business: seed `rng` at the call site.
    pub fn random_bipolar<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut hv = Self::zero();
        for c in hv.components.iter_mut() {
            *c = if rng.gen_range(-1.0f64..1.0) > 0.0 {
                T::ONE
            } else {
                T::MINUS_ONE
            };
        }
        hv
    }

    /// Return underlying components
    #[inline]
    pub fn components(&self) -> &[T; D] {
        &self.components
    }

    /// Dot product accumulated in `f64`
    #[inline]
    pub fn dot(&self, rhs: &Self) -> f64 {
        self.components
            .iter()
            .zip(rhs.components.iter())
            .map(|(&a, &b)| a.to_f64() * b.to_f64())
            .sum()
    }

    /// Plain sum of components (signed, no absolute value taken)
    #[inline]
    pub fn l1norm(&self) -> f64 {
        self.components.iter().map(|&c| c.to_f64()).sum()
    }

    /// Sum of squared components
    #[inline]
    pub fn l2norm(&self) -> f64 {
        self.components
            .iter()
            .map(|&c| c.to_f64() * c.to_f64())
            .sum()
    }
}

impl<T: Component> Hv32<T> {
    /// Map hash bits onto components: bit `i` set gives `+1` at `i`, otherwise `-1`.
    #[inline]
    pub fn from_hash(hash: u32) -> Self {
        let mut hv = Self::zero();
        for (i, c) in hv.components.iter_mut().enumerate() {
            *c = if hash & (1 << i) != 0 {
                T::ONE
            } else {
                T::MINUS_ONE
            };
        }
        hv
    }
}

impl<T: Component, const D: usize> Default for Hypervector<T, D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<T, const D: usize> From<[T; D]> for Hypervector<T, D> {
    #[inline]
    fn from(components: [T; D]) -> Self {
        Self { components }
    }
}

impl<T, const D: usize> Index<usize> for Hypervector<T, D> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &T {
        &self.components[idx]
    }
}

impl<T: Component, const D: usize> AddAssign for Hypervector<T, D> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.components.iter_mut().zip(rhs.components) {
            *a = a.wrapping_add(b);
        }
    }
}

impl<T: Component, const D: usize> SubAssign for Hypervector<T, D> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.components.iter_mut().zip(rhs.components) {
            *a = a.wrapping_sub(b);
        }
    }
}

impl<T: Component, const D: usize> MulAssign<T> for Hypervector<T, D> {
    #[inline]
    fn mul_assign(&mut self, scalar: T) {
        for a in self.components.iter_mut() {
            *a *= scalar;
        }
    }
}

impl<T: Component, const D: usize> Add for Hypervector<T, D> {
    type Output = Self;

    #[inline]
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<T: Component, const D: usize> Sub for Hypervector<T, D> {
    type Output = Self;

    #[inline]
    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

/// Bind (elementwise product)
impl<T: Component, const D: usize> Mul for Hypervector<T, D> {
    type Output = Self;

    #[inline]
    fn mul(mut self, rhs: Self) -> Self {
        for (a, b) in self.components.iter_mut().zip(rhs.components) {
            *a = *a * b;
        }
        self
    }
}

impl<T: Debug, const D: usize> Debug for Hypervector<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.components.iter()).finish()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_case::test_case;

    #[test_case(0x0000_0000; "all bits clear")]
    #[test_case(0xffff_ffff; "all bits set")]
    #[test_case(0x0000_ffff; "lower half set")]
    #[test_case(0xdead_beef; "mixed bits")]
    fn test_self_dot_equals_dimension(hash: u32) {
        let hv = Hv32::<i16>::from_hash(hash);
        assert_eq!(hv.dot(&hv), 32.0);
        assert_eq!(hv.l2norm(), 32.0);
    }

    #[test]
    fn test_from_hash_bit_mapping() {
        let hv = Hv32::<i32>::from_hash(0b1011);
        assert_eq!(&hv.components()[..5], &[1, 1, -1, 1, -1]);
        assert_eq!(hv.l1norm(), f64::from(3 - 29));
    }

    #[test]
    fn test_arithmetic() {
        let a = Hypervector::<i32, 4>::from([1, -2, 3, -4]);
        let b = Hypervector::<i32, 4>::from([5, 6, -7, 8]);

        assert_eq!(a + b, Hypervector::from([6, 4, -4, 4]));
        assert_eq!(a - b, Hypervector::from([-4, -8, 10, -12]));
        assert_eq!(a * b, Hypervector::from([5, -12, -21, -32]));
        assert_eq!(a.dot(&b), -60.0);
        assert_eq!(a.l1norm(), -2.0);
        assert_eq!(a.l2norm(), 30.0);

        let mut c = a;
        c += b;
        c -= a;
        assert_eq!(c, b);
        c *= -2;
        assert_eq!(c, Hypervector::from([-10, -12, 14, -16]));
    }

    #[test]
    fn test_superposition_wraps_integer_components() {
        let mut a = Hypervector::<i8, 2>::from([i8::MAX, i8::MIN]);
        a += Hypervector::from([1, 0]);
        a -= Hypervector::from([0, 1]);
        assert_eq!(a, Hypervector::from([i8::MIN, i8::MAX]));

        let mut f = Hypervector::<f32, 1>::from([f32::MAX]);
        f += Hypervector::from([f32::MAX]);
        assert_eq!(f[0], f32::INFINITY);
    }

    #[test]
    fn test_dot_does_not_overflow_component_type() {
        let a = Hypervector::<i16, 8>::from([i16::MAX; 8]);
        assert_eq!(a.dot(&a), 8.0 * f64::from(i16::MAX) * f64::from(i16::MAX));
    }

    #[test]
    fn test_random_bipolar_is_reproducible() {
        let a = Hypervector::<i8, 256>::random_bipolar(&mut StdRng::seed_from_u64(7));
        let b = Hypervector::<i8, 256>::random_bipolar(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.components().iter().all(|&c| c == 1 || c == -1));
        assert_eq!(a.dot(&a), 256.0);
    }

    #[test]
    fn test_bind_with_itself_is_identity() {
        let a = Hypervector::<f32, 64>::random_bipolar(&mut StdRng::seed_from_u64(1));
        assert_eq!((a * a).l1norm(), 64.0);
    }
}
