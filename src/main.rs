use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod auth;
mod config;
mod dashboard;
mod db;
mod league;
mod records;
mod stats;

use auth::StaticCredentials;
use config::Config;
use dashboard::AppState;
use db::Database;
use league::{LeagueCache, SpawtzLeague};
use records::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let squad = config.squad()?;
    info!(
        "Squad of {} ({} per match): {}",
        squad.len(),
        squad.max_per_match(),
        squad.players().join(", ")
    );

    let store = RecordStore::open(&config.records_path, squad)
        .with_context(|| format!("Failed to open records table {}", config.records_path))?;
    let loaded = store.load_with_report()?;
    info!(
        "Records table opened: {} ({} matches)",
        store.path().display(),
        loaded.records.len()
    );
    if !loaded.report.is_clean() {
        warn!(
            "Skipped {} unreadable rows and {} malformed entries in {}",
            loaded.report.rows_skipped, loaded.report.entries_skipped, config.records_path
        );
    }

    // League snapshot cache
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);
    let league = LeagueCache::load(db)?;
    let source = SpawtzLeague::new(&config.league_url, config.retry_policy().timeout)?;

    let credentials = StaticCredentials::new(config.credentials.clone());
    if credentials.is_empty() {
        warn!("No credentials configured; match entry and league refresh are disabled");
    } else {
        info!("Write access for roles: {}", credentials.roles().join(", "));
    }

    let dashboard_state = AppState {
        store,
        league: Arc::new(league),
        source: Arc::new(source),
        auth: Arc::new(credentials),
        retry: config.retry_policy(),
        display: config.display_options(),
    };
    let app = dashboard::router(dashboard_state);
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Run dashboard server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
