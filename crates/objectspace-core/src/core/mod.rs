//! Core application logic and configuration

/// Application configuration
pub mod config;

/// Application state management
pub mod app_state;

/// Factory pattern for app creation
pub mod factory;

/// Logging macros
pub mod logging;

// Re-export commonly used items
pub use config::{Config, StorageType};
pub use app_state::AppState;
pub use factory::{ConfiguredAppState, AppStateFactoryError, create_app_state};
