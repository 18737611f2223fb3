//! Application Factory
//!
//! Opens the configured store and wraps it in an [`AppState`] of the
//! matching concrete storage type.

use crate::core::app_state::AppState;
use crate::core::config::{Config, StorageType};
use crate::service::DocumentService;
use crate::storage::{CounterStorage, DocumentStorage, KeyedStorage};
use crate::types::{Error, StoreError};
use crate::log_info;

/// AppState factory errors
#[derive(Debug)]
pub enum AppStateFactoryError {
    /// Storage initialization failed
    StorageInitializationFailed(StoreError),
    /// Configuration error
    ConfigError(String),
}

impl std::fmt::Display for AppStateFactoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppStateFactoryError::StorageInitializationFailed(e) => {
                write!(f, "Storage initialization failed: {}", e)
            }
            AppStateFactoryError::ConfigError(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppStateFactoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppStateFactoryError::StorageInitializationFailed(e) => Some(e),
            AppStateFactoryError::ConfigError(_) => None,
        }
    }
}

impl From<StoreError> for AppStateFactoryError {
    fn from(e: StoreError) -> Self {
        AppStateFactoryError::StorageInitializationFailed(e)
    }
}

/// Enum to hold different AppState configurations
pub enum ConfiguredAppState {
    /// Configuration using the counter-keyed backend
    Counter {
        /// The application state with CounterStorage
        app_state: AppState<CounterStorage>,
    },
    /// Configuration using the uuid-keyed bucket backend
    Keyed {
        /// The application state with KeyedStorage
        app_state: AppState<KeyedStorage>,
    },
}

impl ConfiguredAppState {
    /// Get the HTTP address from config
    pub fn http_addr(&self) -> std::net::SocketAddr {
        self.config().server.http_addr
    }

    /// Configuration the state was built from
    pub fn config(&self) -> &Config {
        match self {
            ConfiguredAppState::Counter { app_state } => &app_state.config,
            ConfiguredAppState::Keyed { app_state } => &app_state.config,
        }
    }

    /// Backend in use
    pub fn storage_type(&self) -> StorageType {
        match self {
            ConfiguredAppState::Counter { .. } => StorageType::Counter,
            ConfiguredAppState::Keyed { .. } => StorageType::Keyed,
        }
    }

    /// Close the underlying store
    pub fn close(&self) -> Result<(), Error> {
        match self {
            ConfiguredAppState::Counter { app_state } => app_state.service.close(),
            ConfiguredAppState::Keyed { app_state } => app_state.service.close(),
        }
    }
}

/// Create AppState based on configuration
pub fn create_app_state(config: Config) -> Result<ConfiguredAppState, AppStateFactoryError> {
    config
        .validate()
        .map_err(|e| AppStateFactoryError::ConfigError(e.to_string()))?;

    log_info!(
        "Creating AppState with storage type: {:?} at {:?}",
        config.storage.storage_type,
        config.storage.data_dir
    );

    match config.storage.storage_type {
        StorageType::Counter => {
            let store = CounterStorage::open(&config.storage)?;
            log_info!("CounterStorage initialized successfully");

            let app_state = AppState::new(DocumentService::new(store), config);
            Ok(ConfiguredAppState::Counter { app_state })
        }
        StorageType::Keyed => {
            let store = KeyedStorage::open(&config.storage)?;
            log_info!("KeyedStorage initialized successfully");

            let app_state = AppState::new(DocumentService::new(store), config);
            Ok(ConfiguredAppState::Keyed { app_state })
        }
    }
}
