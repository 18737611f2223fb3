//! # Objectspace Core
//!
//! Document access layer for the Objectspace JSON document service.
//! This crate owns the storage adapters, the document service that sits
//! between the HTTP surface and the store, configuration and logging.

#![warn(missing_docs)]

/// Core application logic, configuration and logging macros
pub mod core;

/// Type definitions shared across the crate
pub mod types;

/// Storage adapters for the document collection
pub mod storage;

/// Document service: validation, pagination, filtering and encoding
pub mod service;

/// System utilities and metrics
pub mod system;

// Re-export commonly used items
pub use types::{Document, DocumentId, EqualityFilter, PageSpec};
pub use types::{Error, Result, StoreError, ValidationError};
pub use storage::{DocumentStorage, StorageImpl, CounterStorage, KeyedStorage};
pub use service::DocumentService;

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
