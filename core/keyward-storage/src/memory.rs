//! In-process key store.

use crate::{BindOutcome, KeyStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use keyward_types::{LicenseKey, NewLicenseKey};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// A key store that lives only as long as the process.
///
/// Mutations take the write lock, which makes every check-then-write a
/// single atomic step.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: RwLock<BTreeMap<String, LicenseKey>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = LicenseKey>) -> Self {
        let keys = records
            .into_iter()
            .map(|record| (record.key.clone(), record))
            .collect();
        Self {
            keys: RwLock::new(keys),
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<LicenseKey>> {
        Ok(self.keys.read().await.get(key).cloned())
    }

    async fn create(&self, new: NewLicenseKey) -> StorageResult<LicenseKey> {
        let mut keys = self.keys.write().await;
        match keys.entry(new.key.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(new.key)),
            Entry::Vacant(slot) => Ok(slot.insert(new.into_record(Utc::now())).clone()),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.keys
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn reset_binding(&self, key: &str) -> StorageResult<()> {
        let mut keys = self.keys.write().await;
        let record = keys
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        record.bound_hwid = None;
        Ok(())
    }

    async fn bind_if_unbound(&self, key: &str, hwid: &str) -> StorageResult<BindOutcome> {
        let mut keys = self.keys.write().await;
        let record = keys
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        if let Some(existing) = record.binding() {
            return Ok(BindOutcome::AlreadyBound(existing.to_string()));
        }
        record.bound_hwid = Some(hwid.to_string());
        Ok(BindOutcome::BoundNow)
    }

    async fn list(&self) -> StorageResult<Vec<LicenseKey>> {
        Ok(self.keys.read().await.values().cloned().collect())
    }
}
