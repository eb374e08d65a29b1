//! Crate-wide error type.
//!
//! Every core entry point returns `Result<T>` with this error as its failure
//! type. The protocol adapter is the only place that converts a `CoreError`
//! into the JSON-RPC wire envelope (see `shirokuma-mcp`'s `protocol::types`).

use thiserror::Error;

/// Errors produced by the item store and retrieval engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    #[error("invalid type: '{0}' does not match ^[a-z0-9_]+$")]
    InvalidType(String),

    #[error("invalid priority: '{0}'")]
    InvalidPriority(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("unknown status: '{0}'")]
    UnknownStatus(String),

    #[error("unknown item: {0}")]
    UnknownItem(i64),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    EmbeddingDimMismatch { expected: usize, got: usize },

    #[error("operation timed out")]
    Timeout,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("relation would self-loop on item {0}")]
    ConflictingRelation(i64),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::StorageError(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::StorageError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
