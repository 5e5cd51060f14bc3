//! Multi-table LSH bucket index.
//!
//! Owns L independent hash tables of `2^range_pow` capacity-bounded buckets
//! each. Items are inserted under L cell indices derived from their K·L raw
//! hash codes; queries retrieve the L buckets their own codes select.
//!
//! Retrieval hands out borrowed slices into live bucket storage, so the
//! query path never copies or allocates per bucket. Mutation requires `&mut self`,
//! so concurrent lookups across queries are safe and a rebuild
//! ([`LshTables::clear`]) is an exclusive phase by construction.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use crate::bucket::Bucket;
use crate::config::{CombineScheme, TableConfig};
use crate::error::Result;

/// Per-query vector of one value per table, inline for typical table counts.
pub type PerTable<T> = SmallVec<[T; 16]>;

/// L parallel hash tables of capacity-bounded buckets.
pub struct LshTables {
    config: TableConfig,
    /// `tables[i][cell]` is the bucket at table `i`, cell `cell`.
    tables: Vec<Vec<Bucket>>,
    /// K·L independently drawn odd multipliers, consumed by the mixing
    /// schemes only.
    mix: Vec<u32>,
}

impl LshTables {
    /// Build with a fixed default seed.
    pub fn new(config: TableConfig) -> Result<Self> {
        Self::with_seed(config, 42)
    }

    /// Build with an explicit seed for the mixing constants.
    pub fn with_seed(config: TableConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mix = (0..config.total_codes())
            .map(|_| rng.gen_range(1..=u32::MAX) | 1)
            .collect();
        let cells = config.cells_per_table();
        let tables = (0..config.tables)
            .map(|_| (0..cells).map(|_| Bucket::new(config.bucket_capacity)).collect())
            .collect();
        Ok(Self { config, tables, mix })
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Combine K·L raw codes into one cell index per table.
    ///
    /// Pure and deterministic for a fixed configuration. Every scheme's
    /// result is reduced into `[0, 2^range_pow)` with a final mask; for
    /// code domains that are range-safe by construction the mask is the
    /// identity. [`CombineScheme::MaskedMix`] additionally masks as part of
    /// the scheme itself.
    ///
    /// # Panics
    ///
    /// If `codes.len()` differs from K·L (a caller contract violation, not
    /// a data-dependent condition).
    pub fn hashes_to_index(&self, codes: &[u32]) -> PerTable<u32> {
        let k = self.config.codes_per_table;
        assert_eq!(
            codes.len(),
            self.config.total_codes(),
            "expected {} codes ({} per table x {} tables)",
            self.config.total_codes(),
            k,
            self.config.tables,
        );
        let mask = (self.config.cells_per_table() - 1) as u32;
        let mut indices = PerTable::with_capacity(self.config.tables);
        for i in 0..self.config.tables {
            let mut index: u32 = 0;
            for j in 0..k {
                let code = codes[k * i + j];
                let term = match self.config.scheme {
                    CombineScheme::CodePack => code.wrapping_shl((k - 1 - j) as u32),
                    CombineScheme::ScaledCodePack { bin_size } => {
                        let step = f64::from(bin_size).ln().floor() as u32;
                        code.wrapping_shl((k - 1 - j) as u32 * step)
                    }
                    CombineScheme::MaskedMix | CombineScheme::Mix => {
                        let r = self.mix[k * i + j];
                        let mut h = r.wrapping_mul(r);
                        h ^= h >> 13;
                        h ^= r;
                        h.wrapping_mul(code)
                    }
                };
                index = index.wrapping_add(term);
            }
            if self.config.scheme == CombineScheme::MaskedMix {
                index &= mask;
            }
            indices.push(index & mask);
        }
        indices
    }

    /// Insert `id` into each table's bucket at the given cell indices.
    ///
    /// Returns the slot used per table (diagnostics only; the selector does
    /// not consume slots). Never fails: a full bucket overwrites its oldest
    /// entry.
    ///
    /// # Panics
    ///
    /// If `cells.len() != L` or any cell index is out of table range.
    pub fn insert(&mut self, cells: &[u32], id: u32) -> PerTable<u32> {
        assert_eq!(cells.len(), self.config.tables, "one cell index per table");
        cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| self.tables[i][cell as usize].insert(id))
            .collect()
    }

    /// Single-table insert; returns the slot used.
    pub fn insert_single(&mut self, table: usize, cell: u32, id: u32) -> u32 {
        self.tables[table][cell as usize].insert(id)
    }

    /// Read-only views of each table's bucket at the given cell indices.
    ///
    /// Views alias live bucket storage (biased ids, `0` sentinel); they are
    /// valid for as long as the index is borrowed and cost nothing to
    /// produce.
    pub fn retrieve_all(&self, cells: &[u32]) -> PerTable<&[u32]> {
        assert_eq!(cells.len(), self.config.tables, "one cell index per table");
        cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| self.tables[i][cell as usize].as_slice())
            .collect()
    }

    /// Point lookup of one slot; `None` if the slot was never written.
    pub fn retrieve_one(&self, table: usize, cell: u32, slot: usize) -> Option<u32> {
        self.tables[table][cell as usize].get(slot)
    }

    /// Reset every bucket in every table to empty.
    ///
    /// Used when the index must be rebuilt after the underlying item
    /// vectors change materially; LSH codes are not incrementally
    /// updatable in place. Takes `&mut self`, so no insert or retrieval can
    /// overlap the reset.
    pub fn clear(&mut self) {
        for table in &mut self.tables {
            for bucket in table {
                bucket.clear();
            }
        }
    }

    /// Per-table, per-cell occupancy. Observability only; not used on the
    /// query path.
    pub fn occupancy(&self) -> OccupancySnapshot {
        let tables = self
            .tables
            .iter()
            .map(|table| {
                let cell_sizes: Vec<u32> = table.iter().map(|b| b.len() as u32).collect();
                TableOccupancy {
                    total_entries: cell_sizes.iter().map(|&n| n as usize).sum(),
                    occupied_cells: cell_sizes.iter().filter(|&&n| n > 0).count(),
                    cell_sizes,
                }
            })
            .collect();
        OccupancySnapshot { tables }
    }
}

/// Occupancy of every table at one point in time.
#[derive(Debug, Clone)]
pub struct OccupancySnapshot {
    pub tables: Vec<TableOccupancy>,
}

impl OccupancySnapshot {
    /// Valid entries summed over all tables.
    pub fn total_entries(&self) -> usize {
        self.tables.iter().map(|t| t.total_entries).sum()
    }
}

/// Occupancy of one table.
#[derive(Debug, Clone)]
pub struct TableOccupancy {
    /// Valid entries summed over this table's cells.
    pub total_entries: usize,
    /// Cells holding at least one entry.
    pub occupied_cells: usize,
    /// Valid entries per cell, indexed by cell.
    pub cell_sizes: Vec<u32>,
}
