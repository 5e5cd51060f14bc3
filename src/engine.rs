//! End-to-end retrieval facade.
//!
//! Wires a [`HashFamily`], an [`LshTables`], and a [`CandidateSelector`]
//! into the usual build/query cycle: hash every item's vector into the
//! tables once, then answer queries by hashing the query, pulling the
//! colliding buckets, and selecting a bounded candidate set. Exact scores
//! are only ever computed for the returned candidates (or for everything,
//! under the exact baseline policy).

use smallvec::SmallVec;

use crate::config::{SelectionPolicy, TableConfig};
use crate::error::{IndexError, Result};
use crate::hash::HashFamily;
use crate::score;
use crate::select::{CandidateSelector, Selection};
use crate::table::LshTables;

/// Approximate arg-max retriever over a collection of dense item vectors.
///
/// Items are stored row-major in one flat buffer and identified by their
/// insertion order (`0..len`).
pub struct Retriever {
    hasher: Box<dyn HashFamily>,
    tables: LshTables,
    selector: CandidateSelector,
    /// Row-major item matrix, `len * dim` values.
    items: Vec<f32>,
    dim: usize,
}

impl Retriever {
    /// Build an empty retriever.
    ///
    /// Fails if the hasher's code count does not match the table
    /// configuration's K·L.
    pub fn new(
        hasher: Box<dyn HashFamily>,
        dim: usize,
        table_config: TableConfig,
        policy: SelectionPolicy,
    ) -> Result<Self> {
        Self::with_seed(hasher, dim, table_config, policy, 42)
    }

    pub fn with_seed(
        hasher: Box<dyn HashFamily>,
        dim: usize,
        table_config: TableConfig,
        policy: SelectionPolicy,
        seed: u64,
    ) -> Result<Self> {
        if hasher.num_codes() != table_config.total_codes() {
            return Err(IndexError::InvalidParameter(format!(
                "hasher produces {} codes but tables expect {}",
                hasher.num_codes(),
                table_config.total_codes()
            )));
        }
        if dim == 0 {
            return Err(IndexError::InvalidParameter("dim must be positive".into()));
        }
        let tables = LshTables::with_seed(table_config, seed)?;
        let selector = CandidateSelector::with_seed(policy, 0, seed);
        Ok(Self {
            hasher,
            tables,
            selector,
            items: Vec::new(),
            dim,
        })
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The underlying tables, e.g. for occupancy diagnostics.
    pub fn tables(&self) -> &LshTables {
        &self.tables
    }

    /// Stored vector of one item.
    pub fn item(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dim;
        &self.items[start..start + self.dim]
    }

    /// Store `vector` and hash it into every table; returns the new id.
    pub fn insert(&mut self, vector: &[f32]) -> Result<u32> {
        if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        let id = self.len() as u32;
        let codes = self.hasher.hash_dense(vector);
        let cells = self.tables.hashes_to_index(&codes);
        self.tables.insert(&cells, id);
        self.items.extend_from_slice(vector);
        Ok(id)
    }

    /// Select candidates for a dense query.
    ///
    /// `required` ids are always part of the output (e.g. ground-truth
    /// items that must be evaluated regardless of collisions).
    pub fn query(&mut self, query: &[f32], required: &[u32]) -> Result<Selection> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }
        self.refresh_selector();

        let views: SmallVec<[&[u32]; 16]> = if Self::uses_tables(self.selector.policy()) {
            let codes = self.hasher.hash_dense(query);
            let cells = self.tables.hashes_to_index(&codes);
            self.tables.retrieve_all(&cells)
        } else {
            SmallVec::new()
        };

        let items = &self.items;
        let dim = self.dim;
        let scorer = move |id: u32| {
            let start = id as usize * dim;
            score::dot(query, &items[start..start + dim])
        };
        self.selector.select(&views, required, Some(&scorer))
    }

    /// Select candidates for a sparse query given parallel index/value
    /// slices.
    pub fn query_sparse(
        &mut self,
        indices: &[u32],
        values: &[f32],
        required: &[u32],
    ) -> Result<Selection> {
        if indices.len() != values.len() {
            return Err(IndexError::InvalidParameter(
                "sparse indices and values must have equal length".into(),
            ));
        }
        if let Some(&max) = indices.iter().max() {
            if max as usize >= self.dim {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dim,
                    got: max as usize + 1,
                });
            }
        }
        self.refresh_selector();

        let views: SmallVec<[&[u32]; 16]> = if Self::uses_tables(self.selector.policy()) {
            let codes = self.hasher.hash_sparse(indices, values);
            let cells = self.tables.hashes_to_index(&codes);
            self.tables.retrieve_all(&cells)
        } else {
            SmallVec::new()
        };

        let items = &self.items;
        let dim = self.dim;
        let scorer = move |id: u32| {
            let start = id as usize * dim;
            score::sparse_dot(indices, values, &items[start..start + dim])
        };
        self.selector.select(&views, required, Some(&scorer))
    }

    /// Clear the tables and rehash every stored item.
    ///
    /// Call after item vectors have changed materially: hash codes cannot
    /// be updated incrementally, so the whole index is repopulated. Also
    /// re-permutes the selector's fallback ordering.
    pub fn rebuild(&mut self) {
        self.tables.clear();
        for row in 0..self.len() {
            let start = row * self.dim;
            let codes = self.hasher.hash_dense(&self.items[start..start + self.dim]);
            let cells = self.tables.hashes_to_index(&codes);
            self.tables.insert(&cells, row as u32);
        }
        self.selector.reshuffle();
    }

    /// Like [`Retriever::rebuild`], but with fresh hash functions.
    pub fn rebuild_with(&mut self, hasher: Box<dyn HashFamily>) -> Result<()> {
        if hasher.num_codes() != self.tables.config().total_codes() {
            return Err(IndexError::InvalidParameter(format!(
                "hasher produces {} codes but tables expect {}",
                hasher.num_codes(),
                self.tables.config().total_codes()
            )));
        }
        self.hasher = hasher;
        self.rebuild();
        Ok(())
    }

    fn uses_tables(policy: SelectionPolicy) -> bool {
        matches!(
            policy,
            SelectionPolicy::ThresholdVote { .. } | SelectionPolicy::UnionFill { .. }
        )
    }

    fn refresh_selector(&mut self) {
        let population = self.len() as u32;
        if self.selector.population() != population {
            self.selector.resize(population);
        }
    }
}
