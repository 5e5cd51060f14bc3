//! Signed sparse random projection.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::HashFamily;

/// Default fraction of dimensions sampled per code: dim / ratio.
const DEFAULT_SAMPLE_RATIO: usize = 3;

/// Sparse random projection: each code is the sign bit of the input's dot
/// product with a sparse ±1 projection vector.
///
/// One bit per code, so the packed K-bit table index approximates a random
/// hyperplane partition of the inner-product space. Pairs with
/// [`crate::config::CombineScheme::CodePack`].
#[derive(Debug, Clone)]
pub struct SparseRandomProjection {
    num_codes: usize,
    dim: usize,
    samples_per_code: usize,
    /// Sampled dimensions, `num_codes * samples_per_code`, grouped by code.
    dims: Vec<u32>,
    /// Parallel ±1 signs.
    signs: Vec<f32>,
}

impl SparseRandomProjection {
    pub fn new(num_codes: usize, dim: usize) -> Self {
        Self::with_seed(num_codes, dim, DEFAULT_SAMPLE_RATIO, 42)
    }

    pub fn with_seed(num_codes: usize, dim: usize, sample_ratio: usize, seed: u64) -> Self {
        assert!(dim > 0 && sample_ratio > 0);
        let samples_per_code = (dim / sample_ratio).max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut dims = Vec::with_capacity(num_codes * samples_per_code);
        let mut signs = Vec::with_capacity(num_codes * samples_per_code);
        for _ in 0..num_codes {
            for d in rand::seq::index::sample(&mut rng, dim, samples_per_code) {
                dims.push(d as u32);
                signs.push(if rng.gen::<bool>() { 1.0 } else { -1.0 });
            }
        }
        Self {
            num_codes,
            dim,
            samples_per_code,
            dims,
            signs,
        }
    }

    fn project(&self, code: usize, value_of: impl Fn(u32) -> f32) -> u32 {
        let start = code * self.samples_per_code;
        let end = start + self.samples_per_code;
        let sum: f32 = self.dims[start..end]
            .iter()
            .zip(self.signs[start..end].iter())
            .map(|(&d, &sign)| sign * value_of(d))
            .sum();
        u32::from(sum >= 0.0)
    }
}

impl HashFamily for SparseRandomProjection {
    fn num_codes(&self) -> usize {
        self.num_codes
    }

    fn hash_dense(&self, values: &[f32]) -> Vec<u32> {
        debug_assert_eq!(values.len(), self.dim);
        (0..self.num_codes)
            .map(|code| self.project(code, |d| values[d as usize]))
            .collect()
    }

    fn hash_sparse(&self, indices: &[u32], values: &[f32]) -> Vec<u32> {
        let active: HashMap<u32, f32> = indices
            .iter()
            .zip(values.iter())
            .map(|(&i, &v)| (i, v))
            .collect();
        (0..self.num_codes)
            .map(|code| self.project(code, |d| active.get(&d).copied().unwrap_or(0.0)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_single_bits() {
        let srp = SparseRandomProjection::with_seed(24, 64, 3, 4);
        let values: Vec<f32> = (0..64).map(|i| (i as f32) - 32.0).collect();
        assert!(srp.hash_dense(&values).iter().all(|&c| c <= 1));
    }

    #[test]
    fn opposite_vectors_flip_every_nonzero_projection() {
        let srp = SparseRandomProjection::with_seed(32, 16, 2, 8);
        let values: Vec<f32> = (0..16).map(|i| (i as f32) + 1.0).collect();
        let negated: Vec<f32> = values.iter().map(|v| -v).collect();

        let a = srp.hash_dense(&values);
        let b = srp.hash_dense(&negated);
        // sign(0) maps to 1 on both sides, so only require most bits flip
        let flipped = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();
        assert!(flipped > 16);
    }

    #[test]
    fn sparse_matches_scattered_dense() {
        let srp = SparseRandomProjection::with_seed(16, 20, 3, 12);
        let mut dense = vec![0.0f32; 20];
        dense[4] = 2.5;
        dense[11] = -1.0;
        dense[19] = 0.5;
        assert_eq!(
            srp.hash_sparse(&[4, 11, 19], &[2.5, -1.0, 0.5]),
            srp.hash_dense(&dense)
        );
    }

    #[test]
    fn similar_vectors_agree_on_most_bits() {
        let srp = SparseRandomProjection::with_seed(64, 128, 3, 42);
        let a: Vec<f32> = (0..128).map(|i| ((i * 13) % 31) as f32 - 15.0).collect();
        let mut near = a.clone();
        for v in near.iter_mut().take(4) {
            *v += 0.05;
        }
        let matches = srp
            .hash_dense(&a)
            .iter()
            .zip(srp.hash_dense(&near).iter())
            .filter(|(x, y)| x == y)
            .count();
        assert!(matches > 56, "only {matches}/64 bits agreed");
    }
}
