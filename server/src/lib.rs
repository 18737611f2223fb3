//! # Objectspace Server
//!
//! HTTP surface for the Objectspace JSON document service.

#![warn(missing_docs)]

/// HTTP API handlers and routing
pub mod api;

pub use api::{create_router, start_api_server};
