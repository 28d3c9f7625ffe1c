//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSource;

/// Directory under the platform config dir holding `config.toml`.
pub const APP_DIR: &str = "crewbook";
/// Environment variable prefix for overrides (e.g. `CREWBOOK_DEFAULT_BUDGET`).
pub const ENV_PREFIX: &str = "CREWBOOK";
/// Ducat limit applied to fresh crews unless configured otherwise.
pub const DEFAULT_BUDGET: u32 = 150;

const DEFAULT_CONFIG: &str = r#"# crewbook configuration

# Directory or http(s) base URL holding the catalog index and faction files.
catalog_root = "cards"

# Index document inside catalog_root.
index_file = "index.json"

# Ducat limit for new crews.
default_budget = 150

# tracing filter used when RUST_LOG is unset.
log_filter = "info"

# Location of the local store holding saved crews. Defaults to the platform
# data directory when omitted.
# store_path = "/home/me/.local/share/crewbook/store.json"
"#;

/// Resolved settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory path or `http(s)://` base URL of the catalog.
    pub catalog_root: String,
    /// Index document name within the catalog.
    pub index_file: String,
    /// JSON file backing the local key-value store.
    pub store_path: PathBuf,
    /// Ducat limit for new crews.
    pub default_budget: u32,
    /// Default `tracing` filter directive.
    pub log_filter: String,
}

impl AppConfig {
    /// Load defaults, then the user config file, then environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Same as [`AppConfig::load`] with an explicit config file location.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .set_default("catalog_root", "cards")?
            .set_default("index_file", "index.json")?
            .set_default(
                "store_path",
                default_store_path().to_string_lossy().to_string(),
            )?
            .set_default("default_budget", i64::from(DEFAULT_BUDGET))?
            .set_default("log_filter", "info")?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .context("failed to parse configuration")
    }

    /// Catalog location described by `catalog_root`.
    pub fn catalog_source(&self) -> CatalogSource {
        CatalogSource::parse(&self.catalog_root)
    }
}

/// Platform location of `config.toml`.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Platform location of the local store file.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("store.json")
}

/// Write the commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}
