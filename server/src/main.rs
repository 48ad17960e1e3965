//! Keyward license server
//!
//! Serves license verification and key administration over HTTP.
//!
//! Usage:
//!   keyward-server --port 5000 --backend json --db licenses.json
//!
//! The admin routes are unauthenticated; expose them only behind an
//! authorizing proxy.

use std::{path::PathBuf, sync::Arc, time::Duration};
use anyhow::{Context, Result};
use clap::Parser;
use keyward_server::{build_router, open_store, AppState, Backend};
use keyward_storage::KeyStore;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "keyward-server")]
#[command(about = "HWID-bound license key server")]
struct Args {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "KEYWARD_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// HTTP port
    #[arg(short, long, env = "KEYWARD_PORT", default_value = "5000")]
    port: u16,

    /// Storage engine
    #[arg(long, env = "KEYWARD_BACKEND", value_enum, default_value = "json")]
    backend: Backend,

    /// Path of the key file or database (ignored by the memory backend)
    #[arg(long, env = "KEYWARD_DB", default_value = "licenses.json")]
    db: PathBuf,

    /// Deadline for each store call, in milliseconds
    #[arg(long, env = "KEYWARD_STORE_TIMEOUT_MS", default_value = "5000")]
    store_timeout_ms: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Keyward server starting...");
    let deadline = Duration::from_millis(args.store_timeout_ms);
    let store = open_store(args.backend, &args.db, deadline)
        .await
        .with_context(|| format!("Failed to open {:?} store at {}", args.backend, args.db.display()))?;
    info!(
        "Using {} store (deadline {:?})",
        store.backend_name(),
        deadline
    );

    let app = build_router(Arc::new(AppState::new(store)));
    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Keyward server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
