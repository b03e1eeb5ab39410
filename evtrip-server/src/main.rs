//! EV Trip Replay Server
//!
//! Main server application with web UI and REST API

use anyhow::{Context, Result};
use evtrip_core::{PlaybackEngine, TelemetryStore};
use evtrip_server::{api, config::ServerConfig, manager, state};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting EV Trip Replay Server");

    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Load telemetry
    let store: Arc<dyn TelemetryStore> = match &config.data_path {
        Some(path) => Arc::new(evtrip_adapters::load_csv(path)?),
        None => {
            warn!("No dataset configured (EVTRIP_DATA), serving demo trips");
            Arc::new(evtrip_adapters::demo_store())
        }
    };

    let engine = PlaybackEngine::new(config.engine.clone(), store);
    info!(
        "{} playback slots, {} mode, {} ms ticks",
        config.slots,
        if config.engine.round_trip { "round-trip" } else { "looping" },
        config.engine.tick_period.as_millis()
    );

    // Create application state
    let state = state::AppState::new(engine, config.slots);

    // Build the router
    let app = api::create_router(state.clone());

    // Start tick manager in background
    let cancel = CancellationToken::new();
    let ticker = tokio::spawn(manager::run(state.clone(), cancel.clone()));

    // Start server
    info!("Server listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    ticker.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
