//! maxip: LSH-backed approximate maximum-inner-product retrieval.
//!
//! Given a large collection of high-dimensional item vectors, answer "which
//! items are likely to have the largest inner product with this query?"
//! without computing all inner products. Each item is summarized by K·L
//! integer hash codes, bucketed into L parallel hash tables; a query's own
//! codes look up candidate items that collided with it in at least one
//! table, and only those candidates get exact scores.
//!
//! # Architecture
//!
//! - [`hash`]: interchangeable sketch families producing the raw codes
//!   (winner-take-all, densified WTA, sparse random projection, densified
//!   min-hash) behind one [`hash::HashFamily`] trait.
//! - [`bucket`] / [`table`]: capacity-bounded bucket storage across L
//!   tables of `2^range_pow` cells, with zero-copy retrieval.
//! - [`select`]: candidate-selection policies over raw bucket views:
//!   threshold voting, union with fallback fill, uniform sampling, and an
//!   exact brute-force baseline.
//! - [`engine`]: a [`Retriever`] facade wiring the three together.
//!
//! # The recall/cost trade
//!
//! Buckets are lossy by design: a full bucket overwrites its oldest entry
//! rather than growing, so memory per cell is O(1) and recall is traded
//! for bounded query cost. The union-fill policy compensates on the other
//! side, padding sparse collision sets with random items so a usable
//! candidate set exists even when recall collapses (e.g. right after the
//! item vectors changed).
//!
//! # Example
//!
//! ```rust
//! use maxip::hash::SparseRandomProjection;
//! use maxip::{CombineScheme, Retriever, SelectionPolicy, TableConfig};
//!
//! # fn main() -> maxip::Result<()> {
//! let config = TableConfig {
//!     codes_per_table: 4,
//!     tables: 4,
//!     range_pow: 4,
//!     bucket_capacity: 32,
//!     scheme: CombineScheme::CodePack,
//! };
//! let hasher = Box::new(SparseRandomProjection::new(config.total_codes(), 16));
//! let mut retriever = Retriever::new(
//!     hasher,
//!     16,
//!     config,
//!     SelectionPolicy::UnionFill { floor: 8 },
//! )?;
//!
//! retriever.insert(&[0.25; 16])?;
//! let picked = retriever.query(&[0.25; 16], &[])?;
//! assert!(picked.ids.contains(&0));
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod score;
pub mod select;
pub mod table;

pub use config::{CombineScheme, SelectionPolicy, TableConfig};
pub use engine::Retriever;
pub use error::{IndexError, Result};
pub use select::{CandidateSelector, Selection};
pub use table::{LshTables, OccupancySnapshot, PerTable, TableOccupancy};
