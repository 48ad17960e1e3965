//! HTTP API for the Keyward license server.
//!
//! Routes:
//! - `POST /verify`: check a key against a hardware ID
//! - `POST /admin/add_key`, `/admin/delete_key`, `/admin/reset_hwid`
//! - `GET /admin/list_keys`
//! - `GET /health`
//!
//! The admin routes carry no authentication. Deployments must put an
//! authorization layer in front of `/admin/*`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use keyward_license::{Clock, LicenseError, LifecycleManager, SystemClock, Verdict, Verifier};
use keyward_storage::{
    DeadlineStore, JsonFileKeyStore, KeyStore, MemoryKeyStore, SqliteKeyStore, StorageResult,
};
use keyward_types::{Expiry, HwidLimit, NewLicenseKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Message returned whenever the store cannot serve a request.
pub const STORE_UNAVAILABLE: &str = "Store unavailable";

/// The store shared by every request.
pub type SharedStore = Arc<dyn KeyStore>;

/// Storage engine selection.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Keys live only as long as the process.
    Memory,
    /// SQLite database file.
    Sqlite,
    /// Flat `licenses.json` file.
    Json,
}

/// Opens the selected engine behind a per-call deadline.
pub async fn open_store(
    backend: Backend,
    path: &Path,
    deadline: Duration,
) -> StorageResult<SharedStore> {
    let store: SharedStore = match backend {
        Backend::Memory => Arc::new(DeadlineStore::new(MemoryKeyStore::new(), deadline)),
        Backend::Sqlite => Arc::new(DeadlineStore::new(SqliteKeyStore::open(path)?, deadline)),
        Backend::Json => Arc::new(DeadlineStore::new(
            JsonFileKeyStore::open(path).await?,
            deadline,
        )),
    };
    Ok(store)
}

/// Handler state: the verification path and the admin surface over one store.
pub struct AppState {
    pub verifier: Verifier<SharedStore>,
    pub lifecycle: LifecycleManager<SharedStore>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            verifier: Verifier::with_clock(Arc::clone(&store), clock),
            lifecycle: LifecycleManager::new(store),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VerifyRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub hwid: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hwid: Option<String>,
}

impl VerifyResponse {
    fn refused(message: &str) -> Self {
        Self {
            valid: false,
            message: Some(message.to_string()),
            expiry: None,
            hwid: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AddKeyRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub expiry: Option<String>,
    /// Kept loose so a bad value becomes a 400 with a readable message.
    #[serde(default)]
    pub hwid_limit: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct KeyRequest {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AdminResponse {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn ok_with(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
        }
    }
}

/// One entry of the `list_keys` response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeyListing {
    pub expiry: String,
    pub hwid: Option<String>,
    pub hwid_limit: HwidLimit,
    pub created_at: DateTime<Utc>,
}

// ── Status mapping ───────────────────────────────────────────────

/// HTTP status for a verdict.
#[must_use]
pub fn verdict_status(verdict: &Verdict) -> StatusCode {
    match verdict {
        Verdict::Invalid => StatusCode::NOT_FOUND,
        Verdict::Expired | Verdict::Mismatch => StatusCode::FORBIDDEN,
        Verdict::Valid { .. } => StatusCode::OK,
    }
}

fn verdict_response(verdict: Verdict) -> (StatusCode, Json<VerifyResponse>) {
    let status = verdict_status(&verdict);
    let body = match verdict {
        Verdict::Valid { hwid, expiry } => VerifyResponse {
            valid: true,
            message: None,
            expiry: Some(expiry.to_string()),
            hwid: Some(hwid),
        },
        refused => VerifyResponse::refused(refused.message().unwrap_or_default()),
    };
    (status, Json(body))
}

/// An admin request that did not succeed.
#[derive(Debug)]
pub struct AdminError(pub StatusCode, pub Json<AdminResponse>);

impl AdminError {
    fn new(status: StatusCode, message: &str) -> Self {
        Self(
            status,
            Json(AdminResponse {
                success: false,
                message: Some(message.to_string()),
            }),
        )
    }

    /// The same status with a body of just `{"success": false}`.
    fn without_message(self) -> Self {
        Self(
            self.0,
            Json(AdminResponse {
                success: false,
                message: None,
            }),
        )
    }
}

impl From<LicenseError> for AdminError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::MissingKey => Self::new(StatusCode::BAD_REQUEST, "Key required"),
            LicenseError::AlreadyExists(_) => Self::new(StatusCode::BAD_REQUEST, "Key exists"),
            LicenseError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Key not found"),
            LicenseError::StoreUnavailable(detail) => {
                error!("admin request failed: {}", detail);
                Self::new(StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE)
            }
        }
    }
}

impl From<JsonRejection> for AdminError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("rejected admin body: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body")
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn verify_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> (StatusCode, Json<VerifyResponse>) {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("rejected verify body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(VerifyResponse::refused("Invalid request body")),
            );
        }
    };
    let key = request.key.unwrap_or_default();
    let hwid = request.hwid.unwrap_or_default();

    match state.verifier.verify(&key, &hwid).await {
        Ok(verdict) => verdict_response(verdict),
        Err(e) => {
            error!("verify {} failed: {}", key, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(VerifyResponse::refused(STORE_UNAVAILABLE)),
            )
        }
    }
}

async fn add_key_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AddKeyRequest>, JsonRejection>,
) -> Result<Json<AdminResponse>, AdminError> {
    let Json(request) = body?;

    let hwid_limit = match request.hwid_limit {
        None => HwidLimit::default(),
        Some(raw) => serde_json::from_value(raw)
            .map_err(|_| AdminError::new(StatusCode::BAD_REQUEST, "Invalid hwid_limit"))?,
    };
    let new = NewLicenseKey::new(request.key.unwrap_or_default())
        .with_expiry(request.expiry.map(Expiry::new).unwrap_or_default())
        .with_hwid_limit(hwid_limit);

    state.lifecycle.add_key(new).await?;
    Ok(Json(AdminResponse::ok_with("Key added")))
}

async fn delete_key_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Json<AdminResponse>, AdminError> {
    let Json(request) = body?;
    state
        .lifecycle
        .delete_key(&request.key.unwrap_or_default())
        .await?;
    Ok(Json(AdminResponse::ok()))
}

async fn reset_hwid_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Json<AdminResponse>, AdminError> {
    let Json(request) = body?;
    match state
        .lifecycle
        .reset_hwid(&request.key.unwrap_or_default())
        .await
    {
        Ok(()) => Ok(Json(AdminResponse::ok())),
        Err(e @ LicenseError::NotFound(_)) => Err(AdminError::from(e).without_message()),
        Err(e) => Err(e.into()),
    }
}

async fn list_keys_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, KeyListing>>, AdminError> {
    let keys = state.lifecycle.list_keys().await?;
    let listing = keys
        .into_iter()
        .map(|record| {
            let entry = KeyListing {
                expiry: record.expiry.to_string(),
                hwid: record.bound_hwid,
                hwid_limit: record.hwid_limit,
                created_at: record.created_at,
            };
            (record.key, entry)
        })
        .collect();
    Ok(Json(listing))
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/verify", post(verify_handler))
        .route("/admin/add_key", post(add_key_handler))
        .route("/admin/delete_key", post(delete_key_handler))
        .route("/admin/reset_hwid", post(reset_hwid_handler))
        .route("/admin/list_keys", get(list_keys_handler))
        .with_state(state)
}
