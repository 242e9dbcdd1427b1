//! Server binary for the Stellar Exchange economy.
//!
//! Owns the engine lifecycle: nothing else starts or stops the tick loop.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `stellar-config.yaml` (or `$STELLAR_CONFIG`)
//! 2. Initialize structured logging
//! 3. Connect to `PostgreSQL` when configured, else use the starter galaxy
//! 4. Start the tick engine for the configured runtime capability
//! 5. Serve the economy API until `Ctrl-C`
//! 6. Stop the API, then the engine, then close the pool

mod bootstrap;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use stellar_core::StartOutcome;
use stellar_observer::{AppState, ServerConfig};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::bootstrap::{Assembled, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = bootstrap::load_config(&config_path)?;
    bootstrap::init_logging(&config)?;

    info!(
        config_path = %config_path.display(),
        mode = ?config.runtime.mode,
        capability = ?config.runtime.capability,
        tick_interval_ms = config.engine.tick_interval_ms,
        snapshot_interval_ticks = config.engine.snapshot_interval_ticks,
        max_snapshots = config.engine.max_snapshots,
        "stellar-engine starting"
    );

    let server_config = ServerConfig {
        host: config.infrastructure.observer_host.clone(),
        port: config.infrastructure.observer_port,
    };
    let mode = config.runtime.mode;
    let capability = config.runtime.capability;

    let Assembled { engine, pool } = bootstrap::assemble(config).await?;

    match engine.start(capability).await? {
        StartOutcome::Started | StartOutcome::AlreadyRunning => {}
        StartOutcome::Skipped => {
            info!("Short-lived runtime, serving without a tick loop");
        }
    }

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let app_state = Arc::new(AppState::new(Arc::clone(&engine), mode));
    let mut server = tokio::spawn(async move {
        let shutdown = async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        };
        stellar_observer::start_server(&server_config, app_state, shutdown).await
    });

    let server_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutdown signal received"),
                Err(err) => warn!(%err, "Failed to listen for Ctrl-C, shutting down"),
            }
            let _ = stop_tx.send(true);
            server.await
        }
        finished = &mut server => finished,
    };
    match server_result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(%err, "Economy API exited with an error"),
        Err(err) => warn!(%err, "Economy API task panicked"),
    }

    engine.shutdown().await;
    if let Some(pool) = pool {
        pool.close().await;
    }

    info!(final_tick = engine.current_tick(), "stellar-engine shutdown complete");
    Ok(())
}
