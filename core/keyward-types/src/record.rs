//! The license key record.

use crate::{Expiry, HwidLimit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored license key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseKey {
    /// Opaque key identifier, unique across the store.
    pub key: String,
    /// When the key stops granting access.
    pub expiry: Expiry,
    /// Device limit.
    pub hwid_limit: HwidLimit,
    /// The device bound on first use. `None` until a device verifies.
    pub bound_hwid: Option<String>,
    /// Creation time, informational only.
    pub created_at: DateTime<Utc>,
}

impl LicenseKey {
    /// Returns the bound HWID, treating an empty string as unbound.
    #[must_use]
    pub fn binding(&self) -> Option<&str> {
        self.bound_hwid.as_deref().filter(|hwid| !hwid.is_empty())
    }

    /// Returns true once a device has been bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding().is_some()
    }
}

/// The admin-supplied part of a license key, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLicenseKey {
    pub key: String,
    pub expiry: Expiry,
    pub hwid_limit: HwidLimit,
}

impl NewLicenseKey {
    /// A lifetime, single-device key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expiry: Expiry::default(),
            hwid_limit: HwidLimit::default(),
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: impl Into<Expiry>) -> Self {
        self.expiry = expiry.into();
        self
    }

    #[must_use]
    pub fn with_hwid_limit(mut self, hwid_limit: HwidLimit) -> Self {
        self.hwid_limit = hwid_limit;
        self
    }

    /// Builds the unbound record stored at creation time.
    #[must_use]
    pub fn into_record(self, created_at: DateTime<Utc>) -> LicenseKey {
        LicenseKey {
            key: self.key,
            expiry: self.expiry,
            hwid_limit: self.hwid_limit,
            bound_hwid: None,
            created_at,
        }
    }
}
