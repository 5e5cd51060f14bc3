//! Densified min-wise hashing over active dimensions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{densify_probe, HashFamily, MAX_DENSIFY_ATTEMPTS};

/// How many of a dense vector's largest entries count as active.
const DEFAULT_ACTIVE_TOP: usize = 30;

/// Densified min-hash: every dimension is assigned to one of `num_codes`
/// bins by a fixed random map; each code is the minimum universal hash of
/// the active dimensions landing in its bin, and empty bins borrow from a
/// pseudorandomly probed non-empty bin.
///
/// Codes estimate overlap between the *sets* of active dimensions; values
/// only decide which dimensions are active. Min-hash values span the full
/// `u32` range, so this family requires
/// [`crate::config::CombineScheme::MaskedMix`] (or any range-reducing
/// combination).
#[derive(Debug, Clone)]
pub struct DensifiedMinhash {
    num_codes: usize,
    dim: usize,
    /// Fixed dimension → bin map.
    bins: Vec<u32>,
    /// Universal hash constants (`mul` odd).
    mul: u32,
    add: u32,
    /// Odd constant driving the densification walk.
    mix: u32,
    active_top: usize,
}

impl DensifiedMinhash {
    pub fn new(num_codes: usize, dim: usize) -> Self {
        Self::with_seed(num_codes, dim, DEFAULT_ACTIVE_TOP, 42)
    }

    pub fn with_seed(num_codes: usize, dim: usize, active_top: usize, seed: u64) -> Self {
        assert!(num_codes > 0 && dim > 0 && active_top > 0);
        let mut rng = StdRng::seed_from_u64(seed);
        let bins = (0..dim).map(|_| rng.gen_range(0..num_codes as u32)).collect();
        Self {
            num_codes,
            dim,
            bins,
            mul: rng.gen::<u32>() | 1,
            add: rng.gen::<u32>(),
            mix: rng.gen::<u32>() | 1,
            active_top,
        }
    }

    #[inline]
    fn universal(&self, d: u32) -> u32 {
        self.mul.wrapping_mul(d).wrapping_add(self.add)
    }

    fn hash_active(&self, active: impl Iterator<Item = u32>) -> Vec<u32> {
        let mut mins = vec![u32::MAX; self.num_codes];
        let mut seen = vec![false; self.num_codes];
        for d in active {
            let bin = self.bins[d as usize] as usize;
            let h = self.universal(d);
            if h < mins[bin] {
                mins[bin] = h;
            }
            seen[bin] = true;
        }

        (0..self.num_codes)
            .map(|bin| {
                if seen[bin] {
                    return mins[bin];
                }
                let mut attempt = 0;
                loop {
                    let probe = densify_probe(self.mix, bin, attempt, self.num_codes);
                    if seen[probe] {
                        return mins[probe];
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

impl HashFamily for DensifiedMinhash {
    fn num_codes(&self) -> usize {
        self.num_codes
    }

    fn hash_dense(&self, values: &[f32]) -> Vec<u32> {
        debug_assert_eq!(values.len(), self.dim);
        // a fully dense active set would hash every vector identically, so
        // only the largest entries count as active
        let mut order: Vec<u32> = (0..self.dim as u32).collect();
        let top = self.active_top.min(self.dim);
        order.select_nth_unstable_by(top.saturating_sub(1), |&a, &b| {
            values[b as usize].total_cmp(&values[a as usize])
        });
        order.truncate(top);
        self.hash_active(order.into_iter())
    }

    fn hash_sparse(&self, indices: &[u32], _values: &[f32]) -> Vec<u32> {
        self.hash_active(indices.iter().copied())
    }
}
