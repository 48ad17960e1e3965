//! Error types for the licensing module.

use keyward_storage::StorageError;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Verification outcomes such as an expired key or an HWID mismatch are
/// [`Verdict`](crate::Verdict)s, not errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The request carried no key.
    #[error("license key is required")]
    MissingKey,

    /// No license exists for the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A license already exists for the key.
    #[error("key already exists: {0}")]
    AlreadyExists(String),

    /// The key store could not serve the call.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StorageError> for LicenseError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => Self::NotFound(key),
            StorageError::AlreadyExists(key) => Self::AlreadyExists(key),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
