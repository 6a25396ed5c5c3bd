//! Error types for the sync engine.

use crate::state::SyncDirection;
use mixtape_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A phase of the same direction is already in flight. The caller
    /// must skip this attempt; it never queues or retries immediately.
    #[error("{0} already in flight")]
    ConcurrencyConflict(SyncDirection),

    /// No confirmed identity is present. The caller must wait for the
    /// identity signal.
    #[error("no authenticated user")]
    NotAuthenticated,

    /// Transport-level failure of a dispatched request.
    #[error("network failure: {0}")]
    Network(String),

    /// At least one request in a fanned-out batch failed; the entire
    /// phase is treated as failed and no acknowledgment was committed.
    #[error("{failed} of {total} push requests failed")]
    PartialFailure {
        /// Requests that failed.
        failed: usize,
        /// Requests dispatched in the batch.
        total: usize,
    },

    /// A payload could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local storage error during reconciliation.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// True if the failure means another attempt of the same direction
    /// was already running.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::ConcurrencyConflict(_))
    }
}
