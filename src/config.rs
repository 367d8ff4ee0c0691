use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf};

/// Which `ItemRepository` implementation holds the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Whole inventory in `{cache_dir}/inventory.json`.
    Json,
    /// `inventory` table in a SQLite database.
    Sqlite,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cache_dir: PathBuf,
    pub backend: Backend,
    pub database_url: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Inventory management HTTP service")]
pub struct Args {
    /// Host to bind to (overrides INVENTORY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides INVENTORY_PORT)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Directory holding the JSON document and uploaded photos (overrides INVENTORY_CACHE_DIR)
    #[arg(long, short = 'c', alias = "cache")]
    pub cache_dir: Option<PathBuf>,

    /// Storage backend (overrides INVENTORY_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// SQLite database URL for the sqlite backend (overrides INVENTORY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Maximum request body size in bytes (overrides INVENTORY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key))
    }

    /// Merge `args` over values looked up through `lookup`, then defaults.
    pub fn resolve(
        args: Args,
        lookup: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Result<Self> {
        let var = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", key)),
            }
        };

        // --- Environment fallback ---
        let env_host = var("INVENTORY_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match var("INVENTORY_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing INVENTORY_PORT value `{}`", value))?,
            None => 3000,
        };
        let env_cache = var("INVENTORY_CACHE_DIR")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./cache"));
        let env_backend = match var("INVENTORY_BACKEND")? {
            Some(value) => Backend::from_str(value.trim(), true)
                .map_err(|err| anyhow!(err))
                .with_context(|| format!("parsing INVENTORY_BACKEND value `{}`", value))?,
            None => Backend::Json,
        };
        let env_limit = match var("INVENTORY_MAX_UPLOAD_BYTES")? {
            Some(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing INVENTORY_MAX_UPLOAD_BYTES value `{}`", value))?,
            None => 10 * 1024 * 1024,
        };

        // --- Merge ---
        let cache_dir = args.cache_dir.unwrap_or(env_cache);
        let database_url = match args.database_url {
            Some(url) => url,
            None => var("INVENTORY_DATABASE_URL")?.unwrap_or_else(|| {
                format!("sqlite://{}", cache_dir.join("inventory.db").display())
            }),
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            cache_dir,
            backend: args.backend.unwrap_or(env_backend),
            database_url,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_limit),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.cache_dir.join("uploads")
    }

    pub fn document_path(&self) -> PathBuf {
        self.cache_dir.join("inventory.json")
    }
}
