//! Error types for Hourfill

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HourfillError {
    // Caller input errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Invalid credential: {reason}")]
    InvalidCredential { reason: String },

    // Upstream errors
    #[error("Chunk {start} .. {end} failed: {reason}")]
    ChunkFetch {
        start: String,
        end: String,
        reason: String,
    },

    #[error("Upstream request failed: {reason}")]
    Upstream { reason: String },

    #[error("Upstream response is missing required column '{column}'")]
    Schema { column: String },

    // Ledger errors
    #[error("Ledger already exists at {location}. Pass overwrite to replace it")]
    LedgerWriteConflict { location: String },

    #[error("No ledger found at {location}. Run a backfill first")]
    LedgerMissing { location: String },

    #[error("Run index {index} for series {series} does not follow previous index {previous}")]
    RunIndexRegression {
        series: String,
        index: u64,
        previous: u64,
    },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    #[error("Catalog not found at {path}")]
    CatalogNotFound { path: PathBuf },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HourfillError {
    /// Shorthand for an [`HourfillError::InvalidArgument`]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        HourfillError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, HourfillError::Upstream { .. } | HourfillError::Io(_))
    }
}

impl From<serde_json::Error> for HourfillError {
    fn from(err: serde_json::Error) -> Self {
        HourfillError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HourfillError>;
