//! # Geo Monitor
//!
//! Ingest geo-telemetry records (position, altitude, timestamp, device
//! IMEI, radio-cell metadata) pushed by remote devices over a strict
//! request/reply TCP channel, keep the latest record available as a
//! consistent snapshot, and append every raw payload to an on-disk
//! JSON-array file.

use std::sync::Arc;

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_subscriber;

mod config;
mod error;
mod extract;
mod server;
mod state;
mod store;

use config::Config;
use server::TelemetryServer;
use state::TelemetryState;
use store::JsonArrayStore;

/// Configuration file consulted at startup; missing is fine, the built-in
/// defaults reproduce the original deployment constants.
const CONFIG_PATH: &str = "config/geo-monitor.toml";

/// How often the latest snapshot is logged
const STATUS_INTERVAL_SECS: u64 = 10;

/// Main entry point for the Geo Monitor service
///
/// # Control Flow
///
/// 1. Set up logging with tracing subscriber
/// 2. Load configuration (falling back to defaults when no file exists)
/// 3. Bind the request/reply listener; a bind failure aborts startup
/// 4. Run the ingestion loop alongside a periodic status report of the
///    latest snapshot, until Ctrl+C
///
/// # Errors
///
/// Returns error if the listener endpoint cannot be bound.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Geo Monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration ({CONFIG_PATH}: {e})");
            Config::default()
        }
    };

    let state = Arc::new(TelemetryState::new());
    let store = JsonArrayStore::new(config.store_path());
    info!("Persisting payloads to {}", store.path().display());

    let server = TelemetryServer::bind(&config.listen_addr(), Arc::clone(&state), store).await?;
    info!("Accepting telemetry on {}", server.local_addr());
    let mut server_task = tokio::spawn(async move { server.run().await });

    let mut status_interval = interval(Duration::from_secs(STATUS_INTERVAL_SECS));
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            result = &mut server_task => {
                // run() only returns on an unrecoverable listener error
                result??;
                break;
            }

            // Headless stand-in for the graphical viewer: poll the shared
            // state on our own cadence and report it
            _ = status_interval.tick() => {
                let snap = state.snapshot();
                info!(
                    "Latest: lat {:.6}° lon {:.6}° alt {:.2}m ts {} imei {} cell {} chars",
                    snap.latitude,
                    snap.longitude,
                    snap.altitude,
                    snap.timestamp,
                    snap.device_id,
                    snap.cell_info.len(),
                );
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                server_task.abort();
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_relative() {
        // The service resolves its config next to the working directory,
        // matching the fixed relative layout of the deployment
        assert!(!CONFIG_PATH.starts_with('/'));
    }

    #[test]
    fn test_status_interval_constant() {
        assert_eq!(STATUS_INTERVAL_SECS, 10);
    }
}
