//! Error types for the reconciliation engine
//!
//! Reconciliation itself never fails. These errors come from the edges:
//! configuration, vocabulary loading, source fetches and JSON I/O.

use thiserror::Error;

/// Result type for fallible rct-recon operations
pub type ReconResult<T> = std::result::Result<T, ReconError>;

#[derive(Error, Debug)]
pub enum ReconError {
    /// Shared plumbing error (I/O, TOML parse, config resolution)
    #[error(transparent)]
    Common(#[from] rct_common::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Classifier vocabulary parsed but fails validation
    #[error("Invalid vocabulary: {0}")]
    Vocabulary(String),

    /// A record source could not deliver its batch
    #[error("Source '{name}' fetch failed: {message}")]
    SourceFetch { name: String, message: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        Self::Common(rct_common::Error::Io(err))
    }
}
