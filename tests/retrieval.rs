//! End-to-end retrieval scenarios on small synthetic data.

use maxip::hash::{DensifiedMinhash, DensifiedWta, HashFamily, SparseRandomProjection, Wta};
use maxip::{CombineScheme, LshTables, Retriever, SelectionPolicy, TableConfig};

fn synthetic_vectors(count: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            (0..dim)
                .map(|d| ((i * dim + d) as f32 * 0.73).sin() * 2.0)
                .collect()
        })
        .collect()
}

fn retriever_with(
    hasher: Box<dyn HashFamily>,
    dim: usize,
    scheme: CombineScheme,
    range_pow: u32,
    policy: SelectionPolicy,
) -> Retriever {
    let config = TableConfig {
        codes_per_table: 4,
        tables: 4,
        range_pow,
        bucket_capacity: 64,
        scheme,
    };
    assert_eq!(hasher.num_codes(), config.total_codes());
    Retriever::with_seed(hasher, dim, config, policy, 2024).unwrap()
}

/// Every family: an item queried with its own vector collides with itself
/// in all tables, so the union policy must return it (no eviction possible
/// at this occupancy).
#[test]
fn self_collision_holds_for_every_hash_family() {
    let dim = 32;
    let union = SelectionPolicy::UnionFill { floor: 0 };
    let cases: Vec<(Box<dyn HashFamily>, CombineScheme, u32)> = vec![
        (
            Box::new(Wta::with_seed(16, dim, 8, 5)),
            CombineScheme::ScaledCodePack { bin_size: 8 },
            10,
        ),
        (
            Box::new(DensifiedWta::with_seed(16, dim, 8, 5)),
            CombineScheme::ScaledCodePack { bin_size: 8 },
            10,
        ),
        (
            Box::new(SparseRandomProjection::with_seed(16, dim, 3, 5)),
            CombineScheme::CodePack,
            4,
        ),
        (
            Box::new(DensifiedMinhash::with_seed(16, dim, 6, 5)),
            CombineScheme::MaskedMix,
            8,
        ),
    ];

    for (hasher, scheme, range_pow) in cases {
        let mut r = retriever_with(hasher, dim, scheme, range_pow, union);
        let vectors = synthetic_vectors(12, dim);
        for v in &vectors {
            r.insert(v).unwrap();
        }
        for (id, v) in vectors.iter().enumerate() {
            let picked = r.query(v, &[]).unwrap();
            assert!(
                picked.ids.contains(&(id as u32)),
                "item {id} lost under {scheme:?}"
            );
        }
    }
}

#[test]
fn bucket_eviction_scenario_at_table_level() {
    let config = TableConfig {
        codes_per_table: 2,
        tables: 1,
        range_pow: 4,
        bucket_capacity: 2,
        scheme: CombineScheme::CodePack,
    };
    let mut tables = LshTables::new(config).unwrap();
    for id in [10, 20, 30] {
        tables.insert_single(0, 3, id);
    }

    let views = tables.retrieve_all(&[3]);
    let live: Vec<u32> = views[0].iter().filter_map(|&raw| raw.checked_sub(1)).collect();
    assert_eq!(live.len(), 2);
    assert!(live.contains(&20) && live.contains(&30));
    assert!(!live.contains(&10));
}

/// The documented combination formula: K=2, codes [1, 1] pack to cell 3.
#[test]
fn code_pack_cell_for_known_codes() {
    let config = TableConfig {
        codes_per_table: 2,
        tables: 1,
        range_pow: 4,
        bucket_capacity: 8,
        scheme: CombineScheme::CodePack,
    };
    let mut tables = LshTables::new(config).unwrap();
    let cells = tables.hashes_to_index(&[1, 1]);
    assert_eq!(cells.as_slice(), &[3]);

    tables.insert(&cells, 7);
    assert_eq!(tables.retrieve_one(0, 3, 0), Some(7));
}

/// Exact brute-force baseline as a correctness oracle over five items in
/// three dimensions, against a hand-computed ranking.
#[test]
fn exact_top_k_matches_hand_computed_ranking() {
    let items = [
        [1.0f32, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 1.0, 0.0],
        [1.0, 1.0, 1.0],
    ];
    let hasher = Box::new(SparseRandomProjection::with_seed(16, 3, 1, 1));
    let mut r = retriever_with(
        hasher,
        3,
        CombineScheme::CodePack,
        4,
        SelectionPolicy::ExactTopK { count: 3 },
    );
    for item in &items {
        r.insert(item).unwrap();
    }

    // query [2, 1, 0.5]: scores 2.0, 1.0, 0.5, 3.0, 3.5
    let picked = r.query(&[2.0, 1.0, 0.5], &[]).unwrap();
    assert_eq!(picked.ids, vec![4, 3, 0]);
    assert_eq!(picked.raw_count, 5);

    // a required id outranks everything, even at the worst score
    let picked = r.query(&[2.0, 1.0, 0.5], &[2]).unwrap();
    assert_eq!(picked.ids[0], 2);
    assert_eq!(&picked.ids[1..], &[4, 3]);
}

#[test]
fn union_fill_reaches_floor_even_with_no_collisions() {
    let dim = 16;
    let hasher = Box::new(SparseRandomProjection::with_seed(16, dim, 3, 77));
    let mut r = retriever_with(
        hasher,
        dim,
        CombineScheme::CodePack,
        4,
        SelectionPolicy::UnionFill { floor: 10 },
    );
    for v in &synthetic_vectors(30, dim) {
        r.insert(v).unwrap();
    }

    let picked = r.query(&vec![0.0; dim], &[]).unwrap();
    assert!(picked.ids.len() >= 10);
    assert!(picked.raw_count <= picked.ids.len());
}

#[test]
fn threshold_vote_can_return_empty_without_error() {
    let dim = 16;
    let hasher = Box::new(SparseRandomProjection::with_seed(16, dim, 3, 77));
    let mut r = retriever_with(
        hasher,
        dim,
        CombineScheme::CodePack,
        4,
        // impossible threshold: strictly more than L collisions
        SelectionPolicy::ThresholdVote { threshold: 4 },
    );
    for v in &synthetic_vectors(10, dim) {
        r.insert(v).unwrap();
    }

    let picked = r.query(&synthetic_vectors(10, dim)[0], &[]).unwrap();
    assert!(picked.ids.is_empty());
    assert_eq!(picked.raw_count, 0);
}

#[test]
fn occupancy_reflects_inserts() {
    let dim = 32;
    let hasher = Box::new(DensifiedWta::with_seed(16, dim, 8, 5));
    let mut r = retriever_with(
        hasher,
        dim,
        CombineScheme::ScaledCodePack { bin_size: 8 },
        10,
        SelectionPolicy::UnionFill { floor: 0 },
    );
    for v in &synthetic_vectors(25, dim) {
        r.insert(v).unwrap();
    }

    // 25 items x 4 tables, no bucket can evict at this occupancy
    let snapshot = r.tables().occupancy();
    assert_eq!(snapshot.total_entries(), 100);
    for table in &snapshot.tables {
        assert_eq!(table.total_entries, 25);
        assert!(table.occupied_cells >= 1);
    }
}

#[test]
fn rebuild_with_fresh_hasher_still_answers() {
    let dim = 32;
    let hasher = Box::new(DensifiedWta::with_seed(16, dim, 8, 5));
    let mut r = retriever_with(
        hasher,
        dim,
        CombineScheme::ScaledCodePack { bin_size: 8 },
        10,
        SelectionPolicy::UnionFill { floor: 0 },
    );
    let vectors = synthetic_vectors(12, dim);
    for v in &vectors {
        r.insert(v).unwrap();
    }

    r.rebuild_with(Box::new(DensifiedWta::with_seed(16, dim, 8, 999)))
        .unwrap();
    let picked = r.query(&vectors[5], &[]).unwrap();
    assert!(picked.ids.contains(&5));

    // mismatched replacement hasher is rejected
    assert!(r
        .rebuild_with(Box::new(DensifiedWta::with_seed(8, dim, 8, 1)))
        .is_err());
}
