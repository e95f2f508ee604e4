#![no_main]

use hd_sketch::{Backend, HdSketch, HdSketchSimd};
use libfuzzer_sys::fuzz_target;
use rand::rngs::StdRng;
use rand::SeedableRng;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let seed = wyhash(data, 0);
    let size = usize::from(data[0]) + 1;
    let mut hd: HdSketch<u16> = HdSketch::new(size, &mut StdRng::seed_from_u64(seed));
    let mut portable: HdSketchSimd<u16> =
        HdSketchSimd::with_backend(size, &mut StdRng::seed_from_u64(seed), Backend::Portable)
            .unwrap();
    let mut detected: HdSketchSimd<u16> =
        HdSketchSimd::new(size, &mut StdRng::seed_from_u64(seed));

    let keys: Vec<u16> = data[1..]
        .chunks(2)
        .map(|chunk| chunk.iter().fold(0u16, |k, &b| (k << 8) | u16::from(b)))
        .collect();
    for key in &keys {
        hd.insert(key);
        portable.insert(key);
        detected.insert(key);
    }

    for key in &keys {
        let estimate = hd.estimate(key);
        assert_eq!(estimate, portable.estimate(key));
        assert_eq!(estimate, detected.estimate(key));
        assert!(estimate.is_finite());
    }
});
