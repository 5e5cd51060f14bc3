//! Winner-take-all rank hashing.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::HashFamily;

/// Default comparisons per code.
const DEFAULT_WINDOW: usize = 8;

/// Winner-take-all hashing: each code is the offset of the largest value
/// among a fixed window of randomly chosen dimensions.
///
/// Rank codes are invariant under any monotone transform of the input and
/// bounded in `[0, window)`, which makes them a fit for the bit-packing
/// combination schemes.
#[derive(Debug, Clone)]
pub struct Wta {
    num_codes: usize,
    dim: usize,
    window: usize,
    /// Concatenated permutations of the dimension space, sliced into
    /// windows of `window` probes per code.
    probes: Vec<u32>,
}

impl Wta {
    pub fn new(num_codes: usize, dim: usize) -> Self {
        Self::with_seed(num_codes, dim, DEFAULT_WINDOW, 42)
    }

    pub fn with_seed(num_codes: usize, dim: usize, window: usize, seed: u64) -> Self {
        assert!(dim > 0 && window > 0, "dim and window must be positive");
        let mut rng = StdRng::seed_from_u64(seed);
        let needed = num_codes * window;
        let mut probes = Vec::with_capacity(needed + dim);
        while probes.len() < needed {
            let mut perm: Vec<u32> = (0..dim as u32).collect();
            perm.shuffle(&mut rng);
            probes.extend_from_slice(&perm);
        }
        probes.truncate(needed);
        Self {
            num_codes,
            dim,
            window,
            probes,
        }
    }

    /// Comparisons per code.
    pub fn window(&self) -> usize {
        self.window
    }
}

impl HashFamily for Wta {
    fn num_codes(&self) -> usize {
        self.num_codes
    }

    fn hash_dense(&self, values: &[f32]) -> Vec<u32> {
        debug_assert_eq!(values.len(), self.dim);
        self.probes
            .chunks_exact(self.window)
            .map(|window| {
                let mut best = 0u32;
                let mut best_value = f32::NEG_INFINITY;
                for (offset, &d) in window.iter().enumerate() {
                    let v = values[d as usize];
                    if v > best_value {
                        best_value = v;
                        best = offset as u32;
                    }
                }
                best
            })
            .collect()
    }

    fn hash_sparse(&self, indices: &[u32], values: &[f32]) -> Vec<u32> {
        // WTA probes fixed dimensions, so the sparse form scatters into a
        // dense scratch vector first.
        let mut dense = vec![0.0f32; self.dim];
        for (&i, &v) in indices.iter().zip(values.iter()) {
            dense[i as usize] = v;
        }
        self.hash_dense(&dense)
    }
}
