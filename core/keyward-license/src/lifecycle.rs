//! Administrative key operations.
//!
//! Each operation is a single store call. Callers are expected to sit
//! behind an authorization boundary; nothing here checks who is asking.

use crate::error::{LicenseError, LicenseResult};
use keyward_storage::KeyStore;
use keyward_types::{LicenseKey, NewLicenseKey};
use tracing::info;

/// Adds, removes, resets and lists license keys.
pub struct LifecycleManager<S> {
    store: S,
}

impl<S: KeyStore> LifecycleManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an unbound key.
    ///
    /// # Errors
    ///
    /// [`LicenseError::MissingKey`] for an empty key,
    /// [`LicenseError::AlreadyExists`] if the key is taken.
    pub async fn add_key(&self, new: NewLicenseKey) -> LicenseResult<LicenseKey> {
        if new.key.is_empty() {
            return Err(LicenseError::MissingKey);
        }
        let record = self.store.create(new).await?;
        info!(
            "Added key {} (expiry {}, hwid limit {})",
            record.key, record.expiry, record.hwid_limit
        );
        Ok(record)
    }

    /// Deletes a key. Fails with [`LicenseError::NotFound`].
    pub async fn delete_key(&self, key: &str) -> LicenseResult<()> {
        self.store.delete(key).await?;
        info!("Deleted key {}", key);
        Ok(())
    }

    /// Clears a key's bound HWID so the next device to verify binds it.
    /// Fails with [`LicenseError::NotFound`].
    pub async fn reset_hwid(&self, key: &str) -> LicenseResult<()> {
        self.store.reset_binding(key).await?;
        info!("Reset hwid for key {}", key);
        Ok(())
    }

    /// Lists every key, expired ones included.
    pub async fn list_keys(&self) -> LicenseResult<Vec<LicenseKey>> {
        Ok(self.store.list().await?)
    }
}
