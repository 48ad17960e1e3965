//! Flat JSON file key store.
//!
//! The file layout is:
//!
//! ```json
//! {
//!   "keys": {
//!     "ABC123": { "expiry": "lifetime", "hwid": null, "hwid_limit": 1, "created_at": "..." }
//!   },
//!   "global_payload": ""
//! }
//! ```
//!
//! Older servers wrote each license at the top level of the file, either
//! instead of the `keys` wrapper or beside it. On load, every top-level
//! entry other than `keys` and `global_payload` must be a license and is
//! moved under `keys`; on a clash the top-level entry wins. The next write
//! stores them all in the wrapped form. `global_payload` belongs to the
//! update-distribution feature and is carried through untouched.
//!
//! The whole map is cached in memory. Each mutation builds the next map,
//! writes it to a temporary file, renames it over the original and only
//! then publishes it to readers. Mutations run on a spawned task so a caller
//! that gives up waiting cannot cancel a write halfway.

use crate::{BindOutcome, KeyStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyward_types::{Expiry, HwidLimit, LicenseKey, NewLicenseKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Key store persisted to a single JSON file.
pub struct JsonFileKeyStore {
    inner: Arc<FileInner>,
}

struct FileInner {
    path: PathBuf,
    state: RwLock<FileLayout>,
}

const KEYS_FIELD: &str = "keys";
const PAYLOAD_FIELD: &str = "global_payload";

#[derive(Debug, Clone, Serialize)]
struct FileLayout {
    keys: BTreeMap<String, StoredKey>,
    global_payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredKey {
    expiry: Expiry,
    hwid: Option<String>,
    #[serde(default)]
    hwid_limit: HwidLimit,
    /// Files written before creation times were tracked get the load time.
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::String(String::new())
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            keys: BTreeMap::new(),
            global_payload: empty_payload(),
        }
    }
}

impl StoredKey {
    fn to_record(&self, key: &str) -> LicenseKey {
        LicenseKey {
            key: key.to_string(),
            expiry: self.expiry.clone(),
            hwid_limit: self.hwid_limit,
            bound_hwid: self.hwid.clone(),
            created_at: self.created_at,
        }
    }
}

impl From<LicenseKey> for StoredKey {
    fn from(record: LicenseKey) -> Self {
        Self {
            expiry: record.expiry,
            hwid: record.bound_hwid,
            hwid_limit: record.hwid_limit,
            created_at: record.created_at,
        }
    }
}

impl JsonFileKeyStore {
    /// Opens the store at `path`, creating an empty file if none exists.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        let layout = match tokio::fs::read(&path).await {
            Ok(bytes) => parse_layout(&path, &bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Creating key file {}", path.display());
                let layout = FileLayout::default();
                write_layout(&path, &layout).await?;
                layout
            }
            Err(e) => return Err(e.into()),
        };

        debug!("file store: loaded {} keys from {}", layout.keys.len(), path.display());
        Ok(Self {
            inner: Arc::new(FileInner {
                path,
                state: RwLock::new(layout),
            }),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Applies `change` to a copy of the key map and persists it if the
    /// change reports a modification.
    async fn mutate<T, F>(&self, change: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut BTreeMap<String, StoredKey>) -> StorageResult<Mutation<T>> + Send + 'static,
    {
        tokio::spawn(apply(Arc::clone(&self.inner), change))
            .await
            .map_err(|e| StorageError::Unavailable(format!("file store task failed: {e}")))?
    }
}

/// Splits a key file into its wrapped keys, top-level keys and payload.
fn parse_layout(path: &Path, bytes: &[u8]) -> StorageResult<FileLayout> {
    let mut top: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(bytes)?;
    let global_payload = top.remove(PAYLOAD_FIELD).unwrap_or_else(empty_payload);
    let mut keys = match top.remove(KEYS_FIELD) {
        Some(wrapped) => parse_entries(serde_json::from_value(wrapped)?)?,
        None => BTreeMap::new(),
    };

    if !top.is_empty() {
        info!(
            "Moving {} top-level keys in {} under \"{}\" on next change",
            top.len(),
            path.display(),
            KEYS_FIELD
        );
        keys.extend(parse_entries(top)?);
    }
    Ok(FileLayout {
        keys,
        global_payload,
    })
}

fn parse_entries(
    entries: serde_json::Map<String, serde_json::Value>,
) -> StorageResult<BTreeMap<String, StoredKey>> {
    entries
        .into_iter()
        .map(|(key, value)| -> StorageResult<(String, StoredKey)> {
            let stored = serde_json::from_value(value)
                .map_err(|e| StorageError::InvalidData(format!("key {key}: {e}")))?;
            Ok((key, stored))
        })
        .collect()
}

/// What a mutation did to the key map.
enum Mutation<T> {
    Changed(T),
    Unchanged(T),
}

/// Holds the write lock until the file is replaced, so mutations are
/// serialized and readers never observe an unpersisted state.
async fn apply<T, F>(inner: Arc<FileInner>, change: F) -> StorageResult<T>
where
    F: FnOnce(&mut BTreeMap<String, StoredKey>) -> StorageResult<Mutation<T>>,
{
    let mut state = inner.state.write().await;
    let mut next = state.clone();
    match change(&mut next.keys)? {
        Mutation::Unchanged(out) => Ok(out),
        Mutation::Changed(out) => {
            write_layout(&inner.path, &next).await?;
            *state = next;
            Ok(out)
        }
    }
}

async fn write_layout(path: &Path, layout: &FileLayout) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(layout)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl KeyStore for JsonFileKeyStore {
    fn backend_name(&self) -> &'static str {
        "json-file"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<LicenseKey>> {
        let state = self.inner.state.read().await;
        Ok(state.keys.get(key).map(|stored| stored.to_record(key)))
    }

    async fn create(&self, new: NewLicenseKey) -> StorageResult<LicenseKey> {
        self.mutate(move |keys| {
            if keys.contains_key(&new.key) {
                return Err(StorageError::AlreadyExists(new.key));
            }
            let record = new.into_record(Utc::now());
            keys.insert(record.key.clone(), StoredKey::from(record.clone()));
            Ok(Mutation::Changed(record))
        })
        .await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.mutate(move |keys| match keys.remove(&key) {
            Some(_) => Ok(Mutation::Changed(())),
            None => Err(StorageError::NotFound(key)),
        })
        .await
    }

    async fn reset_binding(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.mutate(move |keys| match keys.get_mut(&key) {
            Some(stored) => {
                stored.hwid = None;
                Ok(Mutation::Changed(()))
            }
            None => Err(StorageError::NotFound(key)),
        })
        .await
    }

    async fn bind_if_unbound(&self, key: &str, hwid: &str) -> StorageResult<BindOutcome> {
        let key = key.to_string();
        let hwid = hwid.to_string();
        self.mutate(move |keys| {
            let stored = keys
                .get_mut(&key)
                .ok_or_else(|| StorageError::NotFound(key.clone()))?;
            if let Some(existing) = stored.hwid.as_deref().filter(|h| !h.is_empty()) {
                return Ok(Mutation::Unchanged(BindOutcome::AlreadyBound(existing.to_string())));
            }
            stored.hwid = Some(hwid);
            Ok(Mutation::Changed(BindOutcome::BoundNow))
        })
        .await
    }

    async fn list(&self) -> StorageResult<Vec<LicenseKey>> {
        let state = self.inner.state.read().await;
        Ok(state
            .keys
            .iter()
            .map(|(key, stored)| stored.to_record(key))
            .collect())
    }
}
