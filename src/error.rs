//! Error types for maxip.

use thiserror::Error;

/// Errors surfaced during index construction and candidate selection.
///
/// Data-dependent outcomes (an empty candidate set, a saturated bucket) are
/// valid results, not errors; only configuration mistakes surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Invalid construction parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between a query/item vector and the index.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The exact top-k policy needs a scorer, but none was provided.
    #[error("selection policy requires a scorer but none was provided")]
    MissingScorer,
}

pub type Result<T> = std::result::Result<T, IndexError>;
