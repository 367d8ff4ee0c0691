use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use config::{AppConfig, Backend};
use services::{
    inventory_service::InventoryService, json_store::JsonFileStore, photo_store::PhotoStore,
    repository::ItemRepository, sqlite_store::SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting inventory-service with config: {:?}", cfg);

    // --- Ensure cache directory exists ---
    if !cfg.cache_dir.exists() {
        fs::create_dir_all(&cfg.cache_dir)?;
        tracing::info!("Created cache directory at {}", cfg.cache_dir.display());
    }

    // --- Storage ---
    let photos = PhotoStore::open(cfg.uploads_dir())
        .await
        .with_context(|| format!("opening uploads directory {}", cfg.uploads_dir().display()))?;
    tracing::info!("Storing photos under {}", photos.root().display());

    let repo: Arc<dyn ItemRepository> = match cfg.backend {
        Backend::Json => {
            let store = JsonFileStore::open(cfg.document_path())
                .await
                .with_context(|| format!("opening {}", cfg.document_path().display()))?;
            tracing::info!("Using JSON document {}", store.path().display());
            Arc::new(store)
        }
        Backend::Sqlite => Arc::new(connect_sqlite(&cfg.database_url).await?),
    };

    // --- Initialize core service ---
    let service = InventoryService::new(repo, photos);

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the SQLite database behind `db_url` and make sure the table exists.
async fn connect_sqlite(db_url: &str) -> Result<SqliteStore> {
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Create the parent directory of a file-backed database if needed
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if !db_path.starts_with(":memory:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database URL `{}`", db_url))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", db_url))?;

    let store = SqliteStore::new(Arc::new(pool));
    store.ensure_schema().await?;
    tracing::info!("Using SQLite database {}", db_url);
    Ok(store)
}
