//! Hot-path benchmarks: hashing, index computation, and candidate selection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use maxip::hash::{DensifiedWta, HashFamily};
use maxip::{CandidateSelector, CombineScheme, LshTables, SelectionPolicy, TableConfig};

const DIM: usize = 128;

fn random_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect()
}

fn table_config(tables: usize) -> TableConfig {
    TableConfig {
        codes_per_table: 6,
        tables,
        range_pow: 12,
        bucket_capacity: 128,
        scheme: CombineScheme::ScaledCodePack { bin_size: 8 },
    }
}

fn bench_hash_to_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_to_index");
    let mut rng = StdRng::seed_from_u64(42);
    let query = random_vector(&mut rng, DIM);

    for tables in [4, 16] {
        let config = table_config(tables);
        let hasher = DensifiedWta::with_seed(config.total_codes(), DIM, 8, 42);
        let index = LshTables::with_seed(config, 42).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(tables), &tables, |b, _| {
            b.iter(|| {
                let codes = hasher.hash_dense(black_box(&query));
                black_box(index.hashes_to_index(&codes))
            })
        });
    }
    group.finish();
}

fn bench_retrieve_and_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("retrieve_and_select");
    let mut rng = StdRng::seed_from_u64(42);

    let config = table_config(8);
    let hasher = DensifiedWta::with_seed(config.total_codes(), DIM, 8, 42);
    let mut index = LshTables::with_seed(config, 42).unwrap();

    const ITEMS: u32 = 10_000;
    for id in 0..ITEMS {
        let vector = random_vector(&mut rng, DIM);
        let cells = index.hashes_to_index(&hasher.hash_dense(&vector));
        index.insert(&cells, id);
    }

    let query = random_vector(&mut rng, DIM);
    let cells = index.hashes_to_index(&hasher.hash_dense(&query));

    for (name, policy) in [
        ("threshold_vote", SelectionPolicy::ThresholdVote { threshold: 2 }),
        ("union_fill", SelectionPolicy::UnionFill { floor: 1000 }),
    ] {
        let mut selector = CandidateSelector::with_seed(policy, ITEMS, 42);
        group.bench_function(name, |b| {
            b.iter(|| {
                let views = index.retrieve_all(black_box(&cells));
                black_box(selector.select(&views, &[], None).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hash_to_index, bench_retrieve_and_select);
criterion_main!(benches);
