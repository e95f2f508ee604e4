#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::collections::HashMap;

use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use hd_sketch::{FrequencySketch, Sketch, SketchConfig};
use pprof::criterion::{Output, PProfProfiler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};

/// Insert and estimate operations are benchmarked against streams of `DEFAULT_MAX_KEYS`
/// distinct keys or environment variable `N` (if defined), at load factors
/// `LOAD_FACTORS` (distinct keys per HD bucket).
const DEFAULT_MAX_KEYS: usize = 1 << 16;
const LOAD_FACTORS: [f64; 4] = [0.5, 1.0, 4.0, 16.0];
/// Rows of the Count-Min Sketches sized to match HD memory
const CMS_HEIGHT: usize = 4;

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Protobuf));
    targets = benchmark
}
criterion_main!(benches);

fn benchmark(c: &mut Criterion) {
    let bench_results_path = std::env::var("BENCH_RESULTS_PATH").unwrap();
    let num_keys = std::env::var("N")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_KEYS);
    let stream = skewed_stream(num_keys * 4, num_keys as u64);

    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(stream.len() as u64));
    for load_factor in LOAD_FACTORS {
        for config in configs(num_keys, load_factor) {
            bench_insert(&mut group, config, load_factor, &stream);
        }
    }
    group.finish();

    let mut group = c.benchmark_group("estimate");
    group.throughput(Throughput::Elements(1));
    for load_factor in LOAD_FACTORS {
        for config in configs(num_keys, load_factor) {
            bench_estimate(&mut group, config, load_factor, &stream);
        }
    }
    group.finish();

    let exact = exact_counts(&stream);
    let results: Vec<StatRecord> = LOAD_FACTORS
        .iter()
        .map(|&load_factor| {
            let [cms_modulo, cms_seeded, hd, hd_simd] =
                configs(num_keys, load_factor).map(|config| measure_error(config, &stream, &exact));
            StatRecord {
                load_factor,
                cms_modulo,
                cms_seeded,
                hd,
                hd_simd,
            }
        })
        .collect();

    let table_config = Settings::default().with(Style::markdown());
    std::fs::write(
        format!("{}/mean_squared_error.md", bench_results_path),
        Table::new(results).with(table_config).to_string(),
    )
    .unwrap();

    let results: Vec<StatRecord> = LOAD_FACTORS
        .iter()
        .map(|&load_factor| {
            let [cms_modulo, cms_seeded, hd, hd_simd] =
                configs(num_keys, load_factor).map(measure_allocations);
            StatRecord {
                load_factor,
                cms_modulo,
                cms_seeded,
                hd,
                hd_simd,
            }
        })
        .collect();

    let table_config = Settings::default().with(Style::markdown());
    std::fs::write(
        format!("{}/memory_usage.md", bench_results_path),
        Table::new(results).with(table_config).to_string(),
    )
    .unwrap();
}

/// All sketches sized to the same memory for `num_keys` distinct keys
fn configs(num_keys: usize, load_factor: f64) -> [SketchConfig; 4] {
    [
        SketchConfig::count_min_matching_hd(num_keys, load_factor, CMS_HEIGHT, false).unwrap(),
        SketchConfig::count_min_matching_hd(num_keys, load_factor, CMS_HEIGHT, true).unwrap(),
        SketchConfig::hd_for_load_factor(num_keys, load_factor, false).unwrap(),
        SketchConfig::hd_for_load_factor(num_keys, load_factor, true).unwrap(),
    ]
}

fn build(config: SketchConfig) -> Sketch<u64, u16> {
    config.build(&mut StdRng::seed_from_u64(12345)).unwrap()
}

fn skewed_stream(len: usize, distinct: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(12345);
    (0..len)
        .map(|_| {
            let r = rng.gen_range(0..distinct);
            r * r / distinct
        })
        .collect()
}

fn exact_counts(stream: &[u64]) -> HashMap<u64, u64> {
    let mut counts = HashMap::new();
    for &key in stream {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

fn bench_insert(
    group: &mut BenchmarkGroup<WallTime>,
    config: SketchConfig,
    load_factor: f64,
    stream: &[u64],
) {
    let name = build(config).name();
    group.bench_with_input(
        BenchmarkId::new(name, load_factor),
        &config,
        |b, &config| {
            b.iter(|| {
                let mut sketch = build(config);
                for key in black_box(stream) {
                    sketch.insert(key);
                }
                sketch
            });
        },
    );
}

fn bench_estimate(
    group: &mut BenchmarkGroup<WallTime>,
    config: SketchConfig,
    load_factor: f64,
    stream: &[u64],
) {
    let mut sketch = build(config);
    for key in stream {
        sketch.insert(key);
    }
    let mut keys = stream.iter().cycle();
    group.bench_function(BenchmarkId::new(sketch.name(), load_factor), |b| {
        b.iter(|| keys.next().map(|key| sketch.estimate(black_box(key))));
    });
}

fn measure_allocations(config: SketchConfig) -> String {
    let _profiler = dhat::Profiler::builder().testing().build();
    let sketch = build(config);
    let stats = dhat::HeapStats::get();
    format!(
        "{} / {} / {}",
        sketch.size_of(),
        stats.total_bytes,
        stats.total_blocks,
    )
}

fn measure_error(config: SketchConfig, stream: &[u64], exact: &HashMap<u64, u64>) -> String {
    let mut sketch = build(config);
    for key in stream {
        sketch.insert(key);
    }
    let squared_error: f64 = exact
        .iter()
        .map(|(key, &count)| (sketch.estimate(key) - count as f64).powi(2))
        .sum();
    let mse = squared_error / exact.len() as f64;

    if mse < 1000.0 {
        format!("{:.4}", mse)
    } else {
        format!("{:.2e}", mse)
    }
}

#[derive(Tabled)]
struct StatRecord {
    load_factor: f64,
    cms_modulo: String,
    cms_seeded: String,
    hd: String,
    hd_simd: String,
}
