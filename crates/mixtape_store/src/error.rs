//! Error types for local storage.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in local storage.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An I/O error from the backing store.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be interpreted.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}
