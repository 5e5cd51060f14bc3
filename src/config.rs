//! Configuration for the multi-table index and candidate selector.
//!
//! Every knob that was historically a process-wide constant (hash scheme,
//! selection mode, vote threshold, bucket capacity) is an explicit value
//! passed at construction, so multiple index instances with different
//! policies can coexist in one process and be tested independently.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// How the K raw codes of one table are combined into a single cell index.
///
/// The scheme is fixed per index instance: every item inserted and every
/// query looked up must go through the same combination, or collisions are
/// meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineScheme {
    /// Left-shift-accumulate: position `j` contributes `code << (k - 1 - j)`.
    ///
    /// Intended for codes already bounded in a tiny domain (sign bits,
    /// small ranks), where the packed result fits the table range.
    CodePack,
    /// Like [`CombineScheme::CodePack`] but each shift is additionally
    /// scaled by `floor(ln(bin_size))`, for codes bounded in
    /// `[0, bin_size)`.
    ScaledCodePack {
        /// Upper bound (exclusive) of the code domain.
        bin_size: u32,
    },
    /// Multiplicative mixing of each code with a per-position odd constant,
    /// masked into table range as part of the scheme.
    ///
    /// The right default for code domains that are not range-safe by
    /// construction (min-hash values, arbitrary integers).
    MaskedMix,
    /// Mixing without the scheme-level mask.
    ///
    /// The accumulated value is still reduced into table range at the
    /// boundary (see [`crate::table::LshTables::hashes_to_index`]), so this
    /// behaves like [`CombineScheme::MaskedMix`] unless the code domain is
    /// itself range-safe.
    Mix,
}

/// Sizing and combination scheme for one [`crate::table::LshTables`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Codes contributed to each table (K).
    pub codes_per_table: usize,
    /// Number of parallel tables (L).
    pub tables: usize,
    /// Each table holds `2^range_pow` cells.
    pub range_pow: u32,
    /// Slots per bucket before circular overwrite kicks in.
    pub bucket_capacity: usize,
    /// Code-combination scheme shared by all inserts and queries.
    pub scheme: CombineScheme,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            codes_per_table: 6,
            tables: 8,
            range_pow: 12,
            bucket_capacity: 128,
            scheme: CombineScheme::Mix,
        }
    }
}

impl TableConfig {
    /// Total codes consumed per item/query: K·L.
    pub fn total_codes(&self) -> usize {
        self.codes_per_table * self.tables
    }

    /// Cells per table: `2^range_pow`.
    pub fn cells_per_table(&self) -> usize {
        1 << self.range_pow
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.codes_per_table == 0 || self.codes_per_table > 32 {
            return Err(IndexError::InvalidParameter(format!(
                "codes_per_table must be in 1..=32, got {}",
                self.codes_per_table
            )));
        }
        if self.tables == 0 {
            return Err(IndexError::InvalidParameter(
                "tables must be at least 1".into(),
            ));
        }
        if self.range_pow == 0 || self.range_pow > 30 {
            return Err(IndexError::InvalidParameter(format!(
                "range_pow must be in 1..=30, got {}",
                self.range_pow
            )));
        }
        if self.bucket_capacity == 0 {
            return Err(IndexError::InvalidParameter(
                "bucket_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Candidate-selection policy applied to raw per-table retrieval results.
///
/// The first two policies consume bucket views; the last two bypass the
/// hash tables entirely and exist as baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Keep ids whose collision count is strictly greater than `threshold`.
    /// Output is unbounded above and may legitimately be empty.
    ThresholdVote {
        /// Minimum (exclusive) number of table collisions.
        threshold: usize,
    },
    /// Keep the full union of colliding ids; if fewer than `floor`, pad
    /// with ids drawn from a pre-shuffled permutation of the population.
    UnionFill {
        /// Minimum candidate count the fill aims for.
        floor: usize,
    },
    /// `count` ids sampled uniformly, required ids first. Recall-agnostic
    /// baseline.
    RandomSample {
        /// Output size (clamped to the population).
        count: usize,
    },
    /// Exact brute-force top-`count` by true score, required ids ranked
    /// first. O(population) oracle.
    ExactTopK {
        /// Output size (clamped to the population).
        count: usize,
    },
}
