//! Objectspace Server
//!
//! Single-collection JSON document service over HTTP.

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use std::path::Path;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use objectspace_core::core::{create_app_state, Config, StorageType};
use objectspace_core::{log_error, log_info, log_warn, Error};
use objectspace_server::api::start_api_server;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let matches = Command::new("objectspace-server")
        .version(objectspace_core::VERSION)
        .about("Single-collection JSON document service")
        .arg(
            Arg::new("db-path")
                .value_name("DB_PATH")
                .help("Directory holding the database (default: object_db)")
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
        )
        .arg(
            Arg::new("http-addr")
                .long("http-addr")
                .value_name("ADDR")
                .help("HTTP server bind address")
        )
        .arg(
            Arg::new("storage-type")
                .long("storage-type")
                .value_name("TYPE")
                .help("Storage backend type (counter, keyed)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
        )
        .get_matches();

    // Load configuration
    let config_path = matches.get_one::<String>("config").map(Path::new);
    let mut config = Config::load(config_path)?;

    // Apply CLI overrides
    apply_cli_overrides(&mut config, &matches)?;
    config.validate()?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    log_info!("Starting Objectspace v{}", objectspace_core::VERSION);

    // Create AppState using factory pattern
    let configured_app_state =
        create_app_state(config).context("Failed to open document store")?;
    log_info!(
        "AppState created with {:?} storage",
        configured_app_state.storage_type()
    );

    // Serve until a shutdown signal arrives and in-flight requests drain
    let served = start_api_server(&configured_app_state, setup_shutdown_handler()).await;
    if let Err(e) = &served {
        log_error!("HTTP server terminated: {}", e);
    }

    // The listener is gone; close the store exactly once
    if let Err(e) = configured_app_state.close() {
        log_warn!("Failed to close store cleanly: {}", e);
    }

    served.context("HTTP server failed")?;
    log_info!("Shutdown complete");
    Ok(())
}

/// Apply command line argument overrides to configuration
fn apply_cli_overrides(config: &mut Config, matches: &ArgMatches) -> objectspace_core::Result<()> {
    if let Some(db_path) = matches.get_one::<String>("db-path") {
        config.storage.data_dir = db_path.into();
    }

    if let Some(addr) = matches.get_one::<String>("http-addr") {
        config.server.http_addr = addr
            .parse()
            .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
    }

    if let Some(storage_type) = matches.get_one::<String>("storage-type") {
        config.storage.storage_type = storage_type.parse::<StorageType>()?;
    }

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log_error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log_error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_warn!("Received Ctrl+C signal");
        },
        _ = terminate => {
            log_warn!("Received terminate signal");
        },
    }
}
