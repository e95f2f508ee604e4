//! Count every 128-mer of a FASTA sequence exactly and with each sketch at equal memory.
//!
//! Usage: `kmer_count <sequence.fa> [load-factor]`
use std::collections::HashMap;
use std::error::Error;
use std::time::Instant;

use hd_sketch::{FrequencySketch, Kmer128, PackedSequence, Sketch, SketchConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOAD_FACTOR: f64 = 4.0;
const CMS_HEIGHT: usize = 4;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: kmer_count <sequence.fa> [load-factor]")?;
    let load_factor = match args.next() {
        Some(v) => v.parse()?,
        None => DEFAULT_LOAD_FACTOR,
    };

    let start = Instant::now();
    let seq = PackedSequence::open(&path)?;
    println!("read {} bases in {:?}", seq.len(), start.elapsed());

    let start = Instant::now();
    let mut exact: HashMap<Kmer128, u32> = HashMap::new();
    for kmer in seq.kmers() {
        *exact.entry(kmer).or_insert(0) += 1;
    }
    println!(
        "exact: {} k-mers, {} distinct in {:?}",
        seq.num_kmers(),
        exact.len(),
        start.elapsed()
    );

    let num_keys = exact.len();
    let configs = [
        SketchConfig::count_min_matching_hd(num_keys, load_factor, CMS_HEIGHT, false)?,
        SketchConfig::count_min_matching_hd(num_keys, load_factor, CMS_HEIGHT, true)?,
        SketchConfig::hd_for_load_factor(num_keys, load_factor, false)?,
        SketchConfig::hd_for_load_factor(num_keys, load_factor, true)?,
    ];

    let mut rng = StdRng::seed_from_u64(12345);
    for config in configs {
        let mut sketch: Sketch<Kmer128, u32> = config.build(&mut rng)?;

        let start = Instant::now();
        for kmer in seq.kmers() {
            sketch.insert(&kmer);
        }
        let insert_time = start.elapsed();

        let start = Instant::now();
        let squared_error: f64 = exact
            .iter()
            .map(|(kmer, &count)| (sketch.estimate(kmer) - f64::from(count)).powi(2))
            .sum();
        let query_time = start.elapsed();

        println!(
            "{:>10}: {} bytes, insert {:?}, query {:?}, mse {:.4}",
            sketch.name(),
            sketch.size_of(),
            insert_time,
            query_time,
            squared_error / num_keys as f64
        );
    }
    Ok(())
}
