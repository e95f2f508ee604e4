use bytemuck::{bytes_of, NoUninit};
use enum_dispatch::enum_dispatch;
use rand::Rng;

use crate::count_min::{CountMinSketch, Counter, ModuloCountMinSketch, SeededCountMinSketch};
use crate::error::SketchError;
use crate::hd_sketch::HdSketch;
use crate::hd_sketch_simd::HdSketchSimd;
use crate::hypervector::HV32_DIM;
use crate::row_hash::RowHashing;

/// Frequency sketches supported by this crate
#[derive(Debug)]
#[enum_dispatch]
pub enum Sketch<K: NoUninit, T: Counter> {
    ModuloCountMin(ModuloCountMinSketch<K, T>),
    SeededCountMin(SeededCountMinSketch<K, T>),
    Hd(HdSketch<K, i16>),
    HdSimd(HdSketchSimd<K>),
}

/// Common contract of all sketches, expressed over the raw bytes of a key.
#[enum_dispatch(Sketch<K, T>)]
pub trait FrequencySketch {
    fn insert_bytes(&mut self, key: &[u8]);
    /// Insert with conservative update where the structure has one
    fn conservative_insert_bytes(&mut self, key: &[u8]) {
        self.insert_bytes(key)
    }
    fn estimate_bytes(&self, key: &[u8]) -> f64;
    fn size_of(&self) -> usize;
}

impl<K: NoUninit, T: Counter, H: RowHashing> FrequencySketch for CountMinSketch<K, T, H> {
    #[inline]
    fn insert_bytes(&mut self, key: &[u8]) {
        CountMinSketch::insert_bytes(self, key)
    }

    #[inline]
    fn conservative_insert_bytes(&mut self, key: &[u8]) {
        CountMinSketch::conservative_insert_bytes(self, key)
    }

    #[inline]
    fn estimate_bytes(&self, key: &[u8]) -> f64 {
        CountMinSketch::estimate_bytes(self, key).to_f64()
    }

    fn size_of(&self) -> usize {
        CountMinSketch::size_of(self)
    }
}

impl<K: NoUninit> FrequencySketch for HdSketch<K, i16> {
    #[inline]
    fn insert_bytes(&mut self, key: &[u8]) {
        HdSketch::insert_bytes(self, key)
    }

    #[inline]
    fn estimate_bytes(&self, key: &[u8]) -> f64 {
        HdSketch::estimate_bytes(self, key)
    }

    fn size_of(&self) -> usize {
        HdSketch::size_of(self)
    }
}

impl<K: NoUninit> FrequencySketch for HdSketchSimd<K> {
    #[inline]
    fn insert_bytes(&mut self, key: &[u8]) {
        HdSketchSimd::insert_bytes(self, key)
    }

    #[inline]
    fn estimate_bytes(&self, key: &[u8]) -> f64 {
        HdSketchSimd::estimate_bytes(self, key)
    }

    fn size_of(&self) -> usize {
        HdSketchSimd::size_of(self)
    }
}

impl<K: NoUninit, T: Counter> Sketch<K, T> {
    #[inline]
    pub fn insert(&mut self, key: &K) {
        self.insert_bytes(bytes_of(key))
    }

    /// Insert `key`, using conservative update for Count-Min variants
    #[inline]
    pub fn conservative_insert(&mut self, key: &K) {
        self.conservative_insert_bytes(bytes_of(key))
    }

    #[inline]
    pub fn estimate(&self, key: &K) -> f64 {
        self.estimate_bytes(bytes_of(key))
    }

    /// Return short name of the underlying structure
    pub fn name(&self) -> &'static str {
        match self {
            Sketch::ModuloCountMin(_) => "cms-modulo",
            Sketch::SeededCountMin(_) => "cms-seeded",
            Sketch::Hd(_) => "hd",
            Sketch::HdSimd(_) => "hd-simd",
        }
    }
}

/// Sketch structure together with its capacity
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SketchConfig {
    ModuloCountMin { width: usize, height: usize },
    SeededCountMin { width: usize, height: usize },
    Hd { size: usize },
    HdSimd { size: usize },
}

impl SketchConfig {
    /// HD sketch with one bucket per `load_factor` expected distinct keys.
    ///
    /// Set `simd` to use packed buckets with vectorized kernels.
    pub fn hd_for_load_factor(
        num_keys: usize,
        load_factor: f64,
        simd: bool,
    ) -> Result<Self, SketchError> {
        let size = buckets_for_load_factor(num_keys, load_factor)?;
        Ok(if simd {
            SketchConfig::HdSimd { size }
        } else {
            SketchConfig::Hd { size }
        })
    }

    /// Count-Min Sketch with `height` rows holding as many counters as the HD
    /// sketch from [`SketchConfig::hd_for_load_factor`] holds components.
    pub fn count_min_matching_hd(
        num_keys: usize,
        load_factor: f64,
        height: usize,
        seeded: bool,
    ) -> Result<Self, SketchError> {
        if height == 0 {
            return Err(SketchError::ZeroCapacity("height"));
        }
        let width = buckets_for_load_factor(num_keys, load_factor)? * HV32_DIM / height + 1;
        Ok(if seeded {
            SketchConfig::SeededCountMin { width, height }
        } else {
            SketchConfig::ModuloCountMin { width, height }
        })
    }

    /// Validate capacity and build the sketch, drawing its parameters from `rng`
    pub fn build<K: NoUninit, T: Counter, R: Rng + ?Sized>(
        self,
        rng: &mut R,
    ) -> Result<Sketch<K, T>, SketchError> {
        self.validate()?;
        let sketch = match self {
            SketchConfig::ModuloCountMin { width, height } => {
                Sketch::ModuloCountMin(CountMinSketch::new(width, height, rng))
            }
            SketchConfig::SeededCountMin { width, height } => {
                Sketch::SeededCountMin(CountMinSketch::new(width, height, rng))
            }
            SketchConfig::Hd { size } => Sketch::Hd(HdSketch::new(size, rng)),
            SketchConfig::HdSimd { size } => Sketch::HdSimd(HdSketchSimd::new(size, rng)),
        };
        Ok(sketch)
    }

    fn validate(&self) -> Result<(), SketchError> {
        match *self {
            SketchConfig::ModuloCountMin { width, height }
            | SketchConfig::SeededCountMin { width, height } => {
                if width == 0 {
                    return Err(SketchError::ZeroCapacity("width"));
                }
                if height == 0 {
                    return Err(SketchError::ZeroCapacity("height"));
                }
            }
            SketchConfig::Hd { size } | SketchConfig::HdSimd { size } => {
                if size == 0 {
                    return Err(SketchError::ZeroCapacity("size"));
                }
            }
        }
        Ok(())
    }
}

fn buckets_for_load_factor(num_keys: usize, load_factor: f64) -> Result<usize, SketchError> {
    if !(load_factor.is_finite() && load_factor > 0.0) {
        return Err(SketchError::InvalidLoadFactor(load_factor));
    }
    let size = (num_keys as f64 / load_factor) as usize;
    if size == 0 {
        return Err(SketchError::ZeroCapacity("size"));
    }
    Ok(size)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_case::test_case;

    type Key = [u32; 8];

    fn key(i: u32) -> Key {
        [i; 8]
    }

    fn build(config: SketchConfig) -> Sketch<Key, u32> {
        config
            .build(&mut StdRng::seed_from_u64(7))
            .expect("valid config")
    }

    #[test_case(SketchConfig::ModuloCountMin { width: 512, height: 4 } => "cms-modulo"; "modulo")]
    #[test_case(SketchConfig::SeededCountMin { width: 512, height: 4 } => "cms-seeded"; "seeded")]
    #[test_case(SketchConfig::Hd { size: 512 } => "hd"; "hd")]
    #[test_case(SketchConfig::HdSimd { size: 512 } => "hd-simd"; "hd simd")]
    fn test_build_and_count(config: SketchConfig) -> &'static str {
        let mut sketch = build(config);
        for _ in 0..3 {
            sketch.insert(&key(1));
        }
        sketch.conservative_insert(&key(1));
        assert_eq!(sketch.estimate(&key(1)), 4.0);
        sketch.name()
    }

    #[test_case(SketchConfig::ModuloCountMin { width: 0, height: 4 } => SketchError::ZeroCapacity("width"); "cms zero width")]
    #[test_case(SketchConfig::SeededCountMin { width: 4, height: 0 } => SketchError::ZeroCapacity("height"); "cms zero height")]
    #[test_case(SketchConfig::Hd { size: 0 } => SketchError::ZeroCapacity("size"); "hd zero size")]
    #[test_case(SketchConfig::HdSimd { size: 0 } => SketchError::ZeroCapacity("size"); "simd zero size")]
    fn test_build_rejects_zero_capacity(config: SketchConfig) -> SketchError {
        config
            .build::<Key, u32, _>(&mut StdRng::seed_from_u64(0))
            .unwrap_err()
    }

    #[test_case(1_000_000, 1.0, false => Ok(SketchConfig::Hd { size: 1_000_000 }); "load one")]
    #[test_case(1_000_000, 4.0, true => Ok(SketchConfig::HdSimd { size: 250_000 }); "load four simd")]
    #[test_case(1_000, 0.5, false => Ok(SketchConfig::Hd { size: 2_000 }); "load half")]
    #[test_case(1_000, 0.0, false => Err(SketchError::InvalidLoadFactor(0.0)); "zero load")]
    #[test_case(1_000, -2.0, false => Err(SketchError::InvalidLoadFactor(-2.0)); "negative load")]
    #[test_case(1, 8.0, false => Err(SketchError::ZeroCapacity("size")); "too few keys")]
    fn test_hd_for_load_factor(
        num_keys: usize,
        load_factor: f64,
        simd: bool,
    ) -> Result<SketchConfig, SketchError> {
        SketchConfig::hd_for_load_factor(num_keys, load_factor, simd)
    }

    #[test_case(1_000_000, 4.0, 4, false => Ok(SketchConfig::ModuloCountMin { width: 2_000_001, height: 4 }); "four rows")]
    #[test_case(1_000_000, 4.0, 8, true => Ok(SketchConfig::SeededCountMin { width: 1_000_001, height: 8 }); "eight rows seeded")]
    #[test_case(1_000, 1.0, 3, false => Ok(SketchConfig::ModuloCountMin { width: 10_667, height: 3 }); "uneven rows")]
    #[test_case(1_000, 1.0, 0, false => Err(SketchError::ZeroCapacity("height")); "zero rows")]
    fn test_count_min_matching_hd(
        num_keys: usize,
        load_factor: f64,
        height: usize,
        seeded: bool,
    ) -> Result<SketchConfig, SketchError> {
        SketchConfig::count_min_matching_hd(num_keys, load_factor, height, seeded)
    }

    #[test]
    fn test_nan_load_factor_rejected() {
        assert!(matches!(
            SketchConfig::hd_for_load_factor(100, f64::NAN, false),
            Err(SketchError::InvalidLoadFactor(_))
        ));
    }

    #[test]
    fn test_matching_memory() {
        // 32 i16 components per bucket against u16 counters
        let hd = build(SketchConfig::hd_for_load_factor(10_000, 2.0, false).unwrap());
        let cms: Sketch<Key, u16> = SketchConfig::count_min_matching_hd(10_000, 2.0, 4, true)
            .unwrap()
            .build(&mut StdRng::seed_from_u64(7))
            .unwrap();
        let diff = hd.size_of().abs_diff(cms.size_of());
        assert!(diff < 256, "hd {} vs cms {}", hd.size_of(), cms.size_of());
    }

    #[test]
    fn test_dispatch_matches_direct_call() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut direct: HdSketch<Key, i16> = HdSketch::new(64, &mut rng);
        let mut dispatched: Sketch<Key, u32> =
            Sketch::from(HdSketch::new(64, &mut StdRng::seed_from_u64(3)));
        for i in 0..1000 {
            direct.insert(&key(i % 97));
            dispatched.insert(&key(i % 97));
        }
        assert!((0..97).all(|i| direct.estimate(&key(i)) == dispatched.estimate(&key(i))));
        assert_eq!(FrequencySketch::size_of(&direct), dispatched.size_of());
    }
}
