//! Densified winner-take-all hashing.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{densify_probe, HashFamily, MAX_DENSIFY_ATTEMPTS};

/// Default offsets representable per bin.
const DEFAULT_BIN_WIDTH: u32 = 8;

/// Densified WTA: every dimension is permuted into one of `num_codes` bins,
/// each code is the in-bin offset of that bin's largest value, and bins
/// left empty by a sparse input borrow their code from a pseudorandomly
/// probed non-empty bin.
///
/// Unlike plain [`super::Wta`], the sparse path touches only the active
/// dimensions, so hashing cost scales with the number of non-zeros.
#[derive(Debug, Clone)]
pub struct DensifiedWta {
    num_codes: usize,
    dim: usize,
    bin_width: u32,
    /// Permuted slot of each dimension: bin = slot / bin_width, offset =
    /// slot % bin_width.
    slots: Vec<u32>,
    /// Odd constant driving the densification walk.
    mix: u32,
}

impl DensifiedWta {
    pub fn new(num_codes: usize, dim: usize) -> Self {
        Self::with_seed(num_codes, dim, DEFAULT_BIN_WIDTH, 42)
    }

    pub fn with_seed(num_codes: usize, dim: usize, bin_width: u32, seed: u64) -> Self {
        assert!(num_codes > 0 && dim > 0 && bin_width > 0);
        let mut rng = StdRng::seed_from_u64(seed);
        let space = num_codes * bin_width as usize;
        // Distinct slots while they last; past `space` dimensions share
        // slots round-robin (the in-bin maximum resolves collisions).
        let mut slots: Vec<u32> = (0..dim).map(|i| (i % space) as u32).collect();
        slots.shuffle(&mut rng);
        Self {
            num_codes,
            dim,
            bin_width,
            slots,
            mix: rng.gen::<u32>() | 1,
        }
    }

    fn hash_active(&self, active: impl Iterator<Item = (u32, f32)>) -> Vec<u32> {
        let mut best_value = vec![f32::NEG_INFINITY; self.num_codes];
        let mut best_offset = vec![u32::MAX; self.num_codes];
        for (d, v) in active {
            let slot = self.slots[d as usize];
            let bin = (slot / self.bin_width) as usize;
            if v > best_value[bin] {
                best_value[bin] = v;
                best_offset[bin] = slot % self.bin_width;
            }
        }

        (0..self.num_codes)
            .map(|bin| {
                if best_offset[bin] != u32::MAX {
                    return best_offset[bin];
                }
                let mut attempt = 0;
                loop {
                    let probe = densify_probe(self.mix, bin, attempt, self.num_codes);
                    if best_offset[probe] != u32::MAX {
                        return best_offset[probe];
                    }
                    attempt += 1;
                    if attempt > MAX_DENSIFY_ATTEMPTS {
                        return 0;
                    }
                }
            })
            .collect()
    }
}

impl HashFamily for DensifiedWta {
    fn num_codes(&self) -> usize {
        self.num_codes
    }

    fn hash_dense(&self, values: &[f32]) -> Vec<u32> {
        debug_assert_eq!(values.len(), self.dim);
        self.hash_active(values.iter().enumerate().map(|(d, &v)| (d as u32, v)))
    }

    fn hash_sparse(&self, indices: &[u32], values: &[f32]) -> Vec<u32> {
        self.hash_active(indices.iter().zip(values.iter()).map(|(&d, &v)| (d, v)))
    }
}
