//! The verification path: load, decide, commit the first-use binding.

use crate::clock::{Clock, SystemClock};
use crate::engine::{decide, Decision, Mutation, Verdict};
use crate::error::LicenseResult;
use keyward_storage::{BindOutcome, KeyStore, StorageError};
use std::sync::Arc;
use tracing::{debug, info};

/// Verifies keys against devices and records first-use bindings.
pub struct Verifier<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: KeyStore> Verifier<S> {
    /// Creates a verifier that compares expiries against local time.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Verifies `hwid` against `key`.
    ///
    /// When the key is still unbound, the binding is committed with
    /// [`KeyStore::bind_if_unbound`]. If another device won the binding in
    /// the meantime, the verdict becomes [`Verdict::Mismatch`]; if the key
    /// disappeared, [`Verdict::Invalid`].
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::StoreUnavailable`](crate::LicenseError) when
    /// the store cannot serve either call.
    pub async fn verify(&self, key: &str, hwid: &str) -> LicenseResult<Verdict> {
        let record = self.store.get(key).await?;
        let Decision { verdict, mutation } = decide(record.as_ref(), hwid, self.clock.now());

        let Some(Mutation::BindHwid(candidate)) = mutation else {
            debug!("verify {}: {:?}", key, verdict);
            return Ok(verdict);
        };

        match self.store.bind_if_unbound(key, &candidate).await {
            Ok(BindOutcome::BoundNow) => {
                info!("Bound key {} to hwid {}", key, candidate);
                Ok(verdict)
            }
            // Same device verified twice concurrently.
            Ok(BindOutcome::AlreadyBound(existing)) if existing == candidate => Ok(verdict),
            Ok(BindOutcome::AlreadyBound(existing)) => {
                info!(
                    "Key {} bound to {} concurrently, refusing {}",
                    key, existing, candidate
                );
                Ok(Verdict::Mismatch)
            }
            Err(StorageError::NotFound(_)) => {
                debug!("Key {} deleted during verification", key);
                Ok(Verdict::Invalid)
            }
            Err(e) => Err(e.into()),
        }
    }
}
