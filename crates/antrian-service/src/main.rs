//! Service binary for the Antrian patient queue.
//!
//! Wires configuration, logging, the queue store, and the HTTP server
//! together and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `ANTRIAN_CONFIG` or `antrian-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the queue store from its snapshot file
//! 4. Build shared state and spawn the broadcast task
//! 5. Serve HTTP and `WebSocket` traffic

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use antrian_core::config::LoggingConfig;
use antrian_core::{QueueStore, ServiceConfig};
use antrian_server::{AppState, ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServiceError;

/// Config file used when `ANTRIAN_CONFIG` is not set.
const DEFAULT_CONFIG_FILE: &str = "antrian-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or the server
/// fails to bind or serve.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so it comes first.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("antrian-service starting");
    info!(
        config_file = %config_path.display(),
        host = %config.server.host,
        port = config.server.port,
        data_file = %config.storage.data_file.display(),
        "Configuration loaded"
    );

    // 3. Open the store.
    let store = Arc::new(QueueStore::open(config.storage.data_file.clone()).await);
    info!(patients = store.len().await, "Queue store ready");

    // 4. Shared state.
    let state = Arc::new(AppState::with_buffer(
        store,
        config.broadcast.subscriber_buffer,
    ));

    // 5. Serve.
    let server_config = ServerConfig::from(&config);
    start_server(&server_config, state)
        .await
        .map_err(ServiceError::from)?;

    info!("antrian-service stopped");
    Ok(())
}

/// Load configuration from `ANTRIAN_CONFIG`, falling back to
/// `antrian-config.yaml`. A missing file yields defaults with environment
/// overrides applied.
fn load_config() -> Result<(ServiceConfig, PathBuf), ServiceError> {
    let path = std::env::var_os("ANTRIAN_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    let config = if path.exists() {
        ServiceConfig::from_file(&path)?
    } else {
        ServiceConfig::parse("")?
    };
    Ok((config, path))
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence
/// over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
