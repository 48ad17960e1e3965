//! Per-call deadlines for any key store.

use crate::{BindOutcome, KeyStore, StorageError, StorageResult};
use async_trait::async_trait;
use keyward_types::{LicenseKey, NewLicenseKey};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Deadline applied when none is configured.
pub const DEFAULT_STORE_DEADLINE: Duration = Duration::from_secs(5);

/// Wraps a store so that no call waits longer than a fixed deadline.
///
/// A call that misses the deadline fails with
/// [`StorageError::Unavailable`]. Engines keep their own all-or-nothing
/// guarantee, so an abandoned call either lands completely or not at all.
///
/// An elapsed deadline does not cancel work already handed to the engine:
/// the SQLite and file engines finish it on their own task. `Unavailable`
/// therefore means "outcome unknown", and the create or bind may still have
/// been committed.
#[derive(Debug, Clone)]
pub struct DeadlineStore<S> {
    inner: S,
    deadline: Duration,
}

impl<S: KeyStore> DeadlineStore<S> {
    #[must_use]
    pub fn new(inner: S, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    /// Returns the configured deadline.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = StorageResult<T>> + Send,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} store: {} exceeded {:?} deadline",
                    self.inner.backend_name(),
                    op,
                    self.deadline
                );
                Err(StorageError::Unavailable(format!(
                    "{op} exceeded {:?} deadline",
                    self.deadline
                )))
            }
        }
    }
}

#[async_trait]
impl<S: KeyStore> KeyStore for DeadlineStore<S> {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn get(&self, key: &str) -> StorageResult<Option<LicenseKey>> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn create(&self, new: NewLicenseKey) -> StorageResult<LicenseKey> {
        self.bounded("create", self.inner.create(new)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    async fn reset_binding(&self, key: &str) -> StorageResult<()> {
        self.bounded("reset_binding", self.inner.reset_binding(key)).await
    }

    async fn bind_if_unbound(&self, key: &str, hwid: &str) -> StorageResult<BindOutcome> {
        self.bounded("bind_if_unbound", self.inner.bind_if_unbound(key, hwid))
            .await
    }

    async fn list(&self) -> StorageResult<Vec<LicenseKey>> {
        self.bounded("list", self.inner.list()).await
    }
}
