//! License key storage for Keyward.
//!
//! Every engine implements [`KeyStore`], whose hardest requirement is that
//! [`KeyStore::create`] and [`KeyStore::bind_if_unbound`] are atomic: when
//! several callers race on the same key, exactly one of them wins.
//!
//! # Engines
//!
//! - [`MemoryKeyStore`]: a map behind an async `RwLock`
//! - [`SqliteKeyStore`]: conditional SQL statements on a single connection
//! - [`JsonFileKeyStore`]: the flat `licenses.json` layout, written through
//!   on every mutation
//!
//! [`DeadlineStore`] wraps any engine and turns slow calls into
//! [`StorageError::Unavailable`].

mod deadline;
mod error;
mod file;
mod memory;
mod sqlite;

pub use deadline::{DeadlineStore, DEFAULT_STORE_DEADLINE};
pub use error::{StorageError, StorageResult};
pub use file::JsonFileKeyStore;
pub use memory::MemoryKeyStore;
pub use sqlite::SqliteKeyStore;

use async_trait::async_trait;
use keyward_types::{LicenseKey, NewLicenseKey};
use std::sync::Arc;

/// Result of [`KeyStore::bind_if_unbound`] for an existing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The key was unbound and now carries the presented HWID.
    BoundNow,
    /// The key was already bound; carries the HWID it is bound to.
    AlreadyBound(String),
}

/// Durable mapping from key identifier to [`LicenseKey`].
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Short engine name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Loads a record, or `None` if the key does not exist.
    async fn get(&self, key: &str) -> StorageResult<Option<LicenseKey>>;

    /// Inserts an unbound record stamped with the current time.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if the key is present.
    /// The existence check and the insert are one atomic step.
    async fn create(&self, new: NewLicenseKey) -> StorageResult<LicenseKey>;

    /// Removes a record. Fails with [`StorageError::NotFound`].
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Clears the bound HWID unconditionally. Fails with
    /// [`StorageError::NotFound`].
    async fn reset_binding(&self, key: &str) -> StorageResult<()>;

    /// Sets the bound HWID only if the key is unbound (null or empty).
    ///
    /// The check and the write are one atomic step: of any number of
    /// concurrent calls on the same unbound key, exactly one returns
    /// [`BindOutcome::BoundNow`]. Fails with [`StorageError::NotFound`].
    async fn bind_if_unbound(&self, key: &str, hwid: &str) -> StorageResult<BindOutcome>;

    /// Returns every record, ordered by key.
    async fn list(&self) -> StorageResult<Vec<LicenseKey>>;
}

#[async_trait]
impl<S: KeyStore + ?Sized> KeyStore for Arc<S> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    async fn get(&self, key: &str) -> StorageResult<Option<LicenseKey>> {
        (**self).get(key).await
    }

    async fn create(&self, new: NewLicenseKey) -> StorageResult<LicenseKey> {
        (**self).create(new).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        (**self).delete(key).await
    }

    async fn reset_binding(&self, key: &str) -> StorageResult<()> {
        (**self).reset_binding(key).await
    }

    async fn bind_if_unbound(&self, key: &str, hwid: &str) -> StorageResult<BindOutcome> {
        (**self).bind_if_unbound(key, hwid).await
    }

    async fn list(&self) -> StorageResult<Vec<LicenseKey>> {
        (**self).list().await
    }
}
