//! Error types for sync operations.

use crate::store::StoreError;

/// Error type for a sync run.
///
/// Every variant aborts the run. State-file corruption is not represented
/// here: it is recovered in place by treating the state as empty.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote store error (list, metadata read, upload, or delete).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Local filesystem error during scanning, hashing, or state persistence.
    #[error("local I/O error: {0}")]
    LocalIo(#[from] std::io::Error),

    /// The state file could not be encoded for writing.
    #[error("couldn't encode state file: {0}")]
    StateEncode(#[from] serde_json::Error),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
