//! Arena server binary
//!
//! Loads configuration and the roster, warms the game cache, publishes a first
//! ranking and runs the daemons until Ctrl-C.

use anyhow::{Context, Result};
use arena_core::WallClock;
use arena_server::{Arena, MemoryGameStore, ServerConfig, StaticRoster};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load().context("failed to load configuration")?;
    let roster = match &config.roster_path {
        Some(path) => StaticRoster::load(path)?,
        None => {
            tracing::warn!("no roster configured, starting with an empty roster");
            StaticRoster::default()
        }
    };

    let arena = Arena::new(
        &config,
        Arc::new(MemoryGameStore::new()),
        Arc::new(roster),
        Arc::new(WallClock),
    );
    arena.start().await.context("failed to start arena")?;

    let settings = arena.settings();
    tracing::info!(
        end_time = %settings.end_time,
        max_concurrent = settings.max_concurrent_matches,
        timeout_secs = settings.match_timeout.num_seconds(),
        expired = arena.is_expired(),
        "arena started"
    );

    let daemons = arena.spawn_daemons(config.daemon_config());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    daemons.shutdown().await;
    tracing::info!("arena stopped");
    Ok(())
}
