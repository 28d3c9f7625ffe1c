mod app;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};

use crewbook_core::{
    config::{self, AppConfig},
    CatalogStore, FileStore, KvCrewRepository,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_filter)?;
    log::info!("crewbook {} starting", env!("CARGO_PKG_VERSION"));

    if let Some(parent) = config.store_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory {}", parent.display()))?;
    }
    let catalog = CatalogStore::from_config(&config);
    let repository = KvCrewRepository::new(FileStore::new(config.store_path.clone()));

    let mut app = app::CrewbookApp::new(catalog, repository, config.default_budget);
    app.run().await
}

fn init_logging(default_filter: &str) -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("crewbook.log");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
