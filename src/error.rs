//! Error types for the vault cleanup library.

use thiserror::Error;

/// Errors that can occur at the I/O boundaries of a cleanup run.
///
/// The merge and dedup core never fails; these only surface from reading or
/// writing the export, the browser CSV, the decision cache, or the prompt.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed browser password export
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The operator prompt could not be read or written
    #[error("prompt error: {0}")]
    Prompt(String),

    /// General error
    #[error("Error: {0}")]
    General(String),
}

/// Result type alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
