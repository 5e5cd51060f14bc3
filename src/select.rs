//! Candidate selection over raw bucket views.
//!
//! Turns the L per-table retrieval results of one query into a bounded,
//! prioritized candidate-id set, according to the configured
//! [`SelectionPolicy`]. The collision tally is a transient per-call map;
//! no state leaks across queries, so independent queries can run in
//! parallel against the same immutable bucket views.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::SelectionPolicy;
use crate::error::{IndexError, Result};

/// Outcome of one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Distinct candidate ids. Ascending for the vote policies; required
    /// ids first for the sampling/exact policies.
    pub ids: Vec<u32>,
    /// Candidate count before any fallback fill or truncation, kept as a
    /// recall statistic; per-policy semantics documented on each method.
    pub raw_count: usize,
}

/// Applies one [`SelectionPolicy`] to raw retrieval results.
///
/// Owns the pre-shuffled id permutation scanned by the fallback fill and a
/// seeded generator, so selection is reproducible under a fixed seed. The
/// selector holds no per-query state.
pub struct CandidateSelector {
    policy: SelectionPolicy,
    population: u32,
    /// Pre-shuffled permutation of `0..population`, scanned from a random
    /// offset by the union-fill fallback.
    shuffled: Vec<u32>,
    rng: StdRng,
}

impl CandidateSelector {
    /// Build with a fixed default seed.
    pub fn new(policy: SelectionPolicy, population: u32) -> Self {
        Self::with_seed(policy, population, 42)
    }

    /// Build with an explicit seed for the permutation and all sampling.
    pub fn with_seed(policy: SelectionPolicy, population: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut shuffled: Vec<u32> = (0..population).collect();
        shuffled.shuffle(&mut rng);
        Self {
            policy,
            population,
            shuffled,
            rng,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Number of items the selector draws from.
    pub fn population(&self) -> u32 {
        self.population
    }

    /// Re-permute the fallback ordering (e.g. between training epochs).
    pub fn reshuffle(&mut self) {
        self.shuffled.shuffle(&mut self.rng);
    }

    /// Change the population and rebuild the fallback permutation.
    pub fn resize(&mut self, population: u32) {
        self.population = population;
        self.shuffled = (0..population).collect();
        self.shuffled.shuffle(&mut self.rng);
    }

    /// Apply the configured policy.
    ///
    /// `views` are the L raw bucket views of one query (ignored by the
    /// sampling/exact policies); `required` ids are always kept regardless
    /// of policy. `scorer` maps an id to its true score and is consulted
    /// only by [`SelectionPolicy::ExactTopK`]; omitting it for that policy
    /// is a configuration error.
    pub fn select(
        &mut self,
        views: &[&[u32]],
        required: &[u32],
        scorer: Option<&dyn Fn(u32) -> f32>,
    ) -> Result<Selection> {
        match self.policy {
            SelectionPolicy::ThresholdVote { threshold } => {
                Ok(self.threshold_vote(views, required, threshold))
            }
            SelectionPolicy::UnionFill { floor } => Ok(self.union_fill(views, required, floor)),
            SelectionPolicy::RandomSample { count } => Ok(self.random_sample(required, count)),
            SelectionPolicy::ExactTopK { count } => {
                let scorer = scorer.ok_or(IndexError::MissingScorer)?;
                Ok(self.exact_top_k(required, count, scorer))
            }
        }
    }

    /// Tally collision counts: for each id in any view, the number of
    /// tables it appeared in. Required ids start at the table count so they
    /// survive any realistic threshold. Each view is scanned up to its
    /// first sentinel.
    fn tally(views: &[&[u32]], required: &HashSet<u32>) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for &id in required {
            counts.insert(id, views.len());
        }
        for view in views {
            for &raw in *view {
                match raw.checked_sub(1) {
                    Some(id) => *counts.entry(id).or_insert(0) += 1,
                    None => break,
                }
            }
        }
        counts
    }

    /// Keep ids whose collision count is strictly greater than `threshold`;
    /// required ids are kept unconditionally. An empty output is a valid
    /// result (the caller decides whether to fall back to a denser policy).
    ///
    /// `raw_count` is the number of kept ids.
    pub fn threshold_vote(
        &self,
        views: &[&[u32]],
        required: &[u32],
        threshold: usize,
    ) -> Selection {
        let required: HashSet<u32> = required.iter().copied().collect();
        let counts = Self::tally(views, &required);
        let mut ids: Vec<u32> = counts
            .into_iter()
            .filter(|&(id, count)| count > threshold || required.contains(&id))
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        Selection {
            raw_count: ids.len(),
            ids,
        }
    }

    /// Keep every colliding id; if fewer than `floor`, pad with ids from
    /// the pre-shuffled permutation starting at a random offset, wrapping
    /// around once, until the floor is met or the population is exhausted.
    ///
    /// Guarantees a usable candidate set even when collisions are sparse
    /// (early in training, rare queries), at the cost of drifting toward
    /// exhaustive evaluation. `raw_count` is the union size before the
    /// fill, which is the interesting recall statistic.
    pub fn union_fill(&mut self, views: &[&[u32]], required: &[u32], floor: usize) -> Selection {
        let required: HashSet<u32> = required.iter().copied().collect();
        let mut counts = Self::tally(views, &required);
        let raw_count = counts.len();

        if counts.len() < floor && !self.shuffled.is_empty() {
            let start = self.rng.gen_range(0..self.shuffled.len());
            for pos in (start..self.shuffled.len()).chain(0..start) {
                if counts.len() >= floor {
                    break;
                }
                counts.entry(self.shuffled[pos]).or_insert(0);
            }
        }

        let mut ids: Vec<u32> = counts.into_keys().collect();
        ids.sort_unstable();
        Selection { ids, raw_count }
    }

    /// `count` ids sampled uniformly without replacement, required ids
    /// first; the hash tables are bypassed entirely. Output size is clamped
    /// to the population. `raw_count` equals the output size.
    pub fn random_sample(&mut self, required: &[u32], count: usize) -> Selection {
        let target = count.min(self.population as usize);
        let mut picked: HashSet<u32> = HashSet::with_capacity(target);
        let mut ids: Vec<u32> = Vec::with_capacity(target.max(required.len()));
        for &id in required {
            if picked.insert(id) {
                ids.push(id);
            }
        }
        while ids.len() < target {
            let id = self.rng.gen_range(0..self.population);
            if picked.insert(id) {
                ids.push(id);
            }
        }
        Selection {
            raw_count: ids.len(),
            ids,
        }
    }

    /// True top-`count` by score over the whole population: the O(N) exact
    /// baseline. Required ids rank strictly ahead of every score-ranked id,
    /// even when their true score is low; everything else sorts by score
    /// descending. `raw_count` is the population size (every item was
    /// scored).
    pub fn exact_top_k(
        &self,
        required: &[u32],
        count: usize,
        scorer: &dyn Fn(u32) -> f32,
    ) -> Selection {
        let n = self.population as usize;
        let required: HashSet<u32> = required.iter().copied().collect();
        let scores: Vec<f32> = (0..self.population).map(|id| scorer(id)).collect();

        let mut order: Vec<u32> = (0..self.population).collect();
        order.sort_by(|&a, &b| {
            let forced = required.contains(&b).cmp(&required.contains(&a));
            forced.then_with(|| scores[b as usize].total_cmp(&scores[a as usize]))
        });
        order.truncate(count.min(n));
        Selection {
            ids: order,
            raw_count: n,
        }
    }
}
