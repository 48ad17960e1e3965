//! SQLite-backed key store.
//!
//! All statements run on one connection behind a mutex, on the blocking
//! thread pool. Atomicity of `create` and `bind_if_unbound` comes from the
//! statements themselves: `INSERT OR IGNORE` and a conditional `UPDATE`,
//! both judged by the number of changed rows.

use crate::{BindOutcome, KeyStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyward_types::{Expiry, HwidLimit, LicenseKey, NewLicenseKey};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SELECT_COLUMNS: &str = "key, expiry, hwid_limit, bound_hwid, created_at";

/// Persistent key store backed by SQLite.
pub struct SqliteKeyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyStore {
    /// Opens (or creates) a key store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory key store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS license_keys (
                key TEXT PRIMARY KEY,
                expiry TEXT NOT NULL,
                hwid_limit TEXT NOT NULL,
                bound_hwid TEXT,
                created_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("sqlite connection poisoned".into()))?;
            op(&guard)
        })
        .await
        .map_err(|e| StorageError::Unavailable(format!("sqlite task failed: {e}")))?
    }
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<LicenseKey>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM license_keys WHERE key = ?1"),
                params![key],
                read_row,
            )
            .optional()?
            .map(StoredRow::into_record)
            .transpose()
        })
        .await
    }

    async fn create(&self, new: NewLicenseKey) -> StorageResult<LicenseKey> {
        let record = new.into_record(Utc::now());
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO license_keys (key, expiry, hwid_limit, bound_hwid, created_at)
                 VALUES (?1, ?2, ?3, NULL, ?4)",
                params![
                    record.key,
                    record.expiry.as_str(),
                    record.hwid_limit.to_string(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            if inserted == 0 {
                return Err(StorageError::AlreadyExists(record.key));
            }
            debug!("sqlite: inserted key {}", record.key);
            Ok(record)
        })
        .await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            match conn.execute("DELETE FROM license_keys WHERE key = ?1", params![key])? {
                0 => Err(StorageError::NotFound(key)),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn reset_binding(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            match conn.execute(
                "UPDATE license_keys SET bound_hwid = NULL WHERE key = ?1",
                params![key],
            )? {
                0 => Err(StorageError::NotFound(key)),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn bind_if_unbound(&self, key: &str, hwid: &str) -> StorageResult<BindOutcome> {
        let key = key.to_string();
        let hwid = hwid.to_string();
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE license_keys SET bound_hwid = ?2
                 WHERE key = ?1 AND (bound_hwid IS NULL OR bound_hwid = '')",
                params![key, hwid],
            )?;
            if updated > 0 {
                return Ok(BindOutcome::BoundNow);
            }

            let existing: Option<Option<String>> = conn
                .query_row(
                    "SELECT bound_hwid FROM license_keys WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            match existing {
                None => Err(StorageError::NotFound(key)),
                Some(bound) => Ok(BindOutcome::AlreadyBound(bound.unwrap_or_default())),
            }
        })
        .await
    }

    async fn list(&self) -> StorageResult<Vec<LicenseKey>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM license_keys ORDER BY key"))?;
            let rows = stmt.query_map([], read_row)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?.into_record()?);
            }
            Ok(records)
        })
        .await
    }
}

/// A row as stored, before the text columns are interpreted.
struct StoredRow {
    key: String,
    expiry: String,
    hwid_limit: String,
    bound_hwid: Option<String>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        key: row.get(0)?,
        expiry: row.get(1)?,
        hwid_limit: row.get(2)?,
        bound_hwid: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl StoredRow {
    fn into_record(self) -> StorageResult<LicenseKey> {
        let hwid_limit: HwidLimit = self.hwid_limit.parse().map_err(|e| {
            StorageError::InvalidData(format!("key {}: {e}", self.key))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StorageError::InvalidData(format!("key {}: created_at: {e}", self.key)))?
            .with_timezone(&Utc);

        Ok(LicenseKey {
            key: self.key,
            expiry: Expiry::new(self.expiry),
            hwid_limit,
            bound_hwid: self.bound_hwid,
            created_at,
        })
    }
}
