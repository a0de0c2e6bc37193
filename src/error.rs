//! Error types for mtree_index

use thiserror::Error;

/// Result type alias for mtree_index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mtree_index operations
///
/// Missing keys and untouched namespaces are not errors: lookups report
/// them as `None`, `false` or an empty path.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Content does not verify against namespace {namespace}: key {key}")]
    InvalidContent { namespace: String, key: String },

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),
}
