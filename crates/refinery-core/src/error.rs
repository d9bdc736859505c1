//! Error types for Refinery Core
//!
//! All fallible operations return [`RefineryError`] through the crate-level
//! [`Result`] alias. Only `Validation` and `StoreWrite` abort a run; the
//! encryption and publication steps degrade with a logged diagnostic.

use thiserror::Error;

/// Result type alias for Refinery operations
pub type Result<T> = std::result::Result<T, RefineryError>;

/// Main error type for Refinery operations
#[derive(Error, Debug)]
pub enum RefineryError {
    /// A required field was absent and the active schema profile allows no default
    #[error("validation error: required field '{field}' is missing")]
    Validation { field: String },

    /// The store transaction failed and was rolled back
    #[error("store write error: {0}")]
    StoreWrite(#[from] rusqlite::Error),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("publication error: {0}")]
    Publication(String),

    /// The input document is missing or structurally unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
