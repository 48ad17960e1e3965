//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No record exists for the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A record already exists for the key.
    #[error("key already exists: {0}")]
    AlreadyExists(String),

    /// The backing engine could not be reached in time or refused the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be turned back into a record.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Returns true for faults of the backing engine, as opposed to the
    /// typed `NotFound`/`AlreadyExists` outcomes.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::NotFound(_) | Self::AlreadyExists(_))
    }
}
