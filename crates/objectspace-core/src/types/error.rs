//! Error types and handling for the Objectspace document service
//!
//! Each layer owns one enum; the top-level [`Error`] wraps them so request
//! handlers can map a single type onto HTTP status codes.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the document service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected request parameters or body
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage layer errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Response serialization failed
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Prometheus metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether the error was caused by the client's request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Store(StoreError::InvalidDocument(_))
        )
    }
}

/// Request validation failures, surfaced as HTTP 400
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required query parameter is absent or empty
    #[error("Please pass POST/PUT/GET parameter value of '{0}'.")]
    MissingParameter(&'static str),

    /// `total` is not an integer >= 1
    #[error("Invalid total page number '{0}'.")]
    InvalidTotal(String),

    /// `page` is not an integer in `0..total`
    #[error("Invalid page number '{0}'.")]
    InvalidPage(String),

    /// Request body is absent or not a JSON object
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// Storage adapter errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The collection could not be opened or created
    #[error("Store unavailable at {path:?}: {reason}")]
    Unavailable {
        /// Location that failed to open
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// Insert payload is missing a required key
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The handle was already closed
    #[error("Store handle is closed")]
    Closed,

    /// Storage engine failure
    #[error("Storage backend error: {0}")]
    Backend(#[from] redb::Error),

    /// Blocking storage task failed to complete
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Build an `Unavailable` error for `path`
    pub fn unavailable(path: &Path, reason: impl std::fmt::Display) -> Self {
        StoreError::Unavailable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

macro_rules! impl_from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for StoreError {
                fn from(err: $err) -> Self {
                    StoreError::Backend(err.into())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
