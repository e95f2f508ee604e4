#![no_main]

use std::collections::HashMap;

use hd_sketch::{ModuloCountMinSketch, SeededCountMinSketch};
use libfuzzer_sys::fuzz_target;
use rand::rngs::StdRng;
use rand::SeedableRng;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let seed = wyhash(data, 0);
    let width = usize::from(data[0]) + 1;
    let height = usize::from(data[1] % 8) + 1;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut modulo: ModuloCountMinSketch<u32> = ModuloCountMinSketch::new(width, height, &mut rng);
    let mut seeded: SeededCountMinSketch<u32> = SeededCountMinSketch::new(width, height, &mut rng);

    let mut exact: HashMap<u32, u32> = HashMap::new();
    for (i, chunk) in data[2..].chunks(2).enumerate() {
        let key = chunk.iter().fold(0u32, |k, &b| (k << 8) | u32::from(b));
        *exact.entry(key).or_insert(0) += 1;
        if i % 2 == 0 {
            modulo.insert(&key);
            seeded.conservative_insert(&key);
        } else {
            modulo.conservative_insert(&key);
            seeded.insert(&key);
        }
    }

    for (key, &count) in &exact {
        assert!(modulo.estimate(key) >= count);
        assert!(seeded.estimate(key) >= count);
    }
    assert!(modulo.size_of() > 0);
    assert!(seeded.size_of() > 0);
});
