//! Application state shared by every request handler

use crate::core::config::Config;
use crate::service::DocumentService;
use crate::storage::StorageImpl;

/// Central application state holding the document service and configuration
pub struct AppState<S: StorageImpl> {
    /// Document service over the configured store
    pub service: DocumentService<S>,

    /// Application configuration
    pub config: Config,
}

// Manual Clone so that S itself need not be Clone; the service holds the store in an Arc
impl<S: StorageImpl> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: StorageImpl> AppState<S> {
    /// Create a new AppState; called by the factory once the store is open
    pub fn new(service: DocumentService<S>, config: Config) -> Self {
        Self { service, config }
    }
}
