//! Type definitions for the Objectspace document service
//!
//! This module contains all type definitions organized by category.

/// System-wide error types
pub mod error;
/// Documents and identifiers
pub mod document;
/// Page selection for partitioned scans
pub mod page;
/// Equality filters for filtered scans
pub mod filter;

// Re-export commonly used types for convenience
pub use error::{Error, Result, StoreError, ValidationError};
pub use document::{Document, DocumentId, decode_document, parse_document};
pub use page::PageSpec;
pub use filter::EqualityFilter;
