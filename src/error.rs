//! Error types
//!
//! Query-time failures (`InvalidQuery`) abort a single request, load-time
//! failures (`CorruptArtifact`) refuse to build a snapshot. `NotFound` is
//! recovered locally by the scorers and never surfaces as a query failure.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, FindabilityError>;

/// Engine error types
#[derive(Error, Debug)]
pub enum FindabilityError {
    /// Item is unknown or has no embedding for the requested modality
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed query input (zero vector, bad weights, dimension mismatch)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Source artifact violates a load-time invariant
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Embedding cache error
    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

impl FindabilityError {
    pub(crate) fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptArtifact(msg.into())
    }
}
