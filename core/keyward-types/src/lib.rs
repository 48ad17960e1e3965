//! Core type definitions for Keyward.
//!
//! This crate defines the single persisted entity of the system, the
//! [`LicenseKey`] record, together with its field types:
//! - [`Expiry`]: raw expiry text with a lenient, total interpretation
//! - [`HwidLimit`]: `"unlimited"` or a positive device count
//!
//! Storage engines and the verification logic live in their own crates and
//! only share these types.

mod expiry;
mod hwid_limit;
mod record;

pub use expiry::{Deadline, Expiry, ExpiryCheck, LIFETIME};
pub use hwid_limit::{HwidLimit, UNLIMITED};
pub use record::{LicenseKey, NewLicenseKey};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building license key types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid hwid limit: {0}")]
    InvalidHwidLimit(String),
}
