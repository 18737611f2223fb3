//! HTTP request handlers for the Objectspace document API
//!
//! Handlers are thin: they extract request input, call the document
//! service and shape its output. Everything that can fail funnels into
//! [`ApiError`], which maps the crate error onto a status code.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};

use objectspace_core::{
    core::AppState,
    log_debug, log_error, log_warn,
    storage::{StorageImpl, StoreSummary},
    system::{render_metrics, Metrics},
    CounterStorage, DocumentId, DocumentService, EqualityFilter, Error, KeyedStorage, PageSpec,
    StoreError, ValidationError,
};

/// Content type of the Prometheus text exposition format
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

// Response types

/// Error body returned with every 4xx/5xx response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Whether the operation was successful (always false)
    pub success: bool,
    /// Error message
    pub error: String,
}

impl ErrorResponse {
    /// Create an error response carrying `error`
    pub fn new(error: String) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

/// Counter backend insert response
#[derive(Debug, Serialize)]
pub struct InsertResponse {
    /// Identifier assigned by the store
    #[serde(rename = "_id")]
    pub id: DocumentId,
}

/// System health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Current system status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Handler error, rendered as `(status, Json<ErrorResponse>)`
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E> From<E> for ApiError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, class) = if self.0.is_client_error() {
            log_warn!("Rejected request: {}", self.0);
            (StatusCode::BAD_REQUEST, "client")
        } else {
            log_error!("Request failed: {}", self.0);
            (StatusCode::INTERNAL_SERVER_ERROR, "server")
        };
        Metrics::global().request_errors.with_label_values(&[class]).inc();

        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

/// Raw request body of an insert
///
/// Unreadable bodies are rejected as malformed with a JSON error body
/// instead of axum's plain-text rejection.
pub struct DocumentBody(pub Bytes);

impl<S> FromRequest<S> for DocumentBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Bytes::from_request(req, state).await {
            Ok(bytes) => Ok(DocumentBody(bytes)),
            Err(rejection) => {
                let reason = rejection.body_text();
                log_warn!("Failed to read request body: {}", reason);
                Err(ValidationError::MalformedBody(reason).into())
            }
        }
    }
}

/// Listing response with the fixed listing headers
fn listing_response(body: Body) -> Response {
    (
        [
            (header::CACHE_CONTROL, "must-revalidate"),
            (header::CONTENT_TYPE, "application/json"),
        ],
        body,
    )
        .into_response()
}

// Shared handlers

/// Root endpoint: document count or bucket statistics
pub async fn root_handler<S: StorageImpl>(
    State(app_state): State<Arc<AppState<S>>>,
) -> Result<Json<StoreSummary>, ApiError> {
    Ok(Json(app_state.service.summary().await?))
}

// Counter backend handlers

/// Insert a document and return its assigned id
pub async fn insert_counter_document(
    State(app_state): State<Arc<AppState<CounterStorage>>>,
    DocumentBody(body): DocumentBody,
) -> Result<Json<InsertResponse>, ApiError> {
    let id = app_state.service.insert(&body).await?;
    Ok(Json(InsertResponse { id }))
}

/// Full or paginated listing as one JSON object
///
/// Pagination applies as soon as either `page` or `total` is present;
/// other parameters are ignored.
pub async fn list_counter_documents(
    State(app_state): State<Arc<AppState<CounterStorage>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let service = &app_state.service;

    let docs = if params.contains_key("page") || params.contains_key("total") {
        let page = PageSpec::from_query(
            params.get("page").map(String::as_str),
            params.get("total").map(String::as_str),
        )?;
        service.list_page(page).await?
    } else {
        service.list_all().await?
    };
    log_debug!("Listing {} documents", docs.len());

    let body = DocumentService::<CounterStorage>::encode_listing(&docs)?;
    Ok(listing_response(Body::from(body)))
}

// Keyed backend handlers

/// Upsert a document under its `uuid`
pub async fn insert_keyed_document(
    State(app_state): State<Arc<AppState<KeyedStorage>>>,
    DocumentBody(body): DocumentBody,
) -> Result<StatusCode, ApiError> {
    app_state.service.insert(&body).await?;
    Ok(StatusCode::OK)
}

/// Stream documents matching every query pair as NDJSON
///
/// The status is decided once the first line (or the end of the scan) is
/// known; a failure after that truncates the body.
pub async fn list_keyed_documents(
    State(app_state): State<Arc<AppState<KeyedStorage>>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let filter = EqualityFilter::from_pairs(params);
    log_debug!("Streaming documents with {} constraints", filter.len());

    let (first, rest) = app_state.service.open_stream(filter).await?;
    let lines = stream::iter(first.map(Ok::<_, StoreError>)).chain(rest.into_stream());
    Ok(listing_response(Body::from_stream(lines)))
}

// System handlers

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: objectspace_core::VERSION.to_string(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics_handler() -> Result<Response, ApiError> {
    let text = render_metrics()?;
    Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], text).into_response())
}
