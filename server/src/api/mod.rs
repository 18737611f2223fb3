//! HTTP API module for the Objectspace server

/// HTTP request handlers
pub mod api_handlers;

/// HTTP server implementation
pub mod api_server;

// Re-export commonly used items
pub use api_handlers::{ApiError, ErrorResponse};
pub use api_server::{create_router, start_api_server};
