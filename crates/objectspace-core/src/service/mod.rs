//! Document service
//!
//! Sits between the HTTP surface and the storage adapter: validates request
//! input, drives scans on the blocking pool, applies page selection and
//! equality filters, and encodes results. The service owns the only
//! reference the request path has to the store.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::storage::{StorageImpl, StoreSummary};
use crate::system::Metrics;
use crate::types::{parse_document, DocumentId, EqualityFilter, PageSpec, Result, StoreError};
use crate::{log_debug, log_error, log_info};

/// Scan helpers
pub mod scan;

pub use scan::{ndjson_line, ScanGuard};
use scan::collect_documents;

/// Lines buffered between a streaming scan and the response body
const STREAM_BUFFER: usize = 64;

/// Item of a streamed listing
pub type StreamItem = std::result::Result<Bytes, StoreError>;

/// Document access over a storage adapter
pub struct DocumentService<S: StorageImpl> {
    store: Arc<S>,
}

// Only clones the Arc, not the store
impl<S: StorageImpl> Clone for DocumentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: StorageImpl> DocumentService<S> {
    /// Take ownership of an opened store
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate `body` as a JSON object and persist it
    pub async fn insert(&self, body: &[u8]) -> Result<DocumentId> {
        let doc = parse_document(body)?;
        let store = self.store.clone();
        let id = run_blocking(move || store.insert(&doc)).await?;

        Metrics::global().documents_inserted.inc();
        log_debug!("Inserted document {}", id);
        Ok(id)
    }

    /// Every decodable document, keyed by identifier
    pub async fn list_all(&self) -> Result<Map<String, Value>> {
        Metrics::global().scans_started.with_label_values(&["all"]).inc();

        let guard = ScanGuard::new();
        let cancelled = guard.flag();
        let store = self.store.clone();
        let docs = run_blocking(move || {
            collect_documents(|visit| store.for_each_all(visit), &cancelled)
        })
        .await?;

        drop(guard);
        Ok(docs)
    }

    /// Decodable documents on one page, keyed by identifier
    pub async fn list_page(&self, page: PageSpec) -> Result<Map<String, Value>> {
        Metrics::global().scans_started.with_label_values(&["page"]).inc();
        log_debug!("Scanning page {} of {}", page.index(), page.total());

        let guard = ScanGuard::new();
        let cancelled = guard.flag();
        let store = self.store.clone();
        let docs = run_blocking(move || {
            collect_documents(|visit| store.for_each_page(page, visit), &cancelled)
        })
        .await?;

        drop(guard);
        Ok(docs)
    }

    /// Stream matching documents as NDJSON lines
    ///
    /// The scan runs on the blocking pool and stops as soon as the returned
    /// receiver is dropped. A store error is delivered as the final item.
    /// Must be called from within a Tokio runtime.
    pub fn stream_matching(&self, filter: EqualityFilter) -> flume::Receiver<StreamItem> {
        let metrics = Metrics::global();
        let kind = if filter.is_empty() { "all" } else { "filter" };
        metrics.scans_started.with_label_values(&[kind]).inc();

        let (tx, rx) = flume::bounded(STREAM_BUFFER);
        let store = self.store.clone();

        tokio::task::spawn_blocking(move || {
            let mut disconnected = false;
            let result = store.for_each_all(&mut |id, raw| {
                if !filter.matches_raw(raw) {
                    return true;
                }
                if tx.send(Ok(ndjson_line(id, raw))).is_err() {
                    disconnected = true;
                    return false;
                }
                metrics.documents_returned.inc();
                true
            });

            if disconnected {
                metrics.scans_cancelled.inc();
            }
            if let Err(e) = result {
                log_error!("Streaming scan failed: {}", e);
                let _ = tx.send(Err(e));
            }
        });

        rx
    }

    /// Start a streaming scan and wait for its first line
    ///
    /// A store failure before any line is produced is returned as an error
    /// rather than buffered into the stream, so callers can still pick a
    /// status code. `None` means the scan finished without a match.
    pub async fn open_stream(
        &self,
        filter: EqualityFilter,
    ) -> Result<(Option<Bytes>, flume::Receiver<StreamItem>)> {
        let rx = self.stream_matching(filter);
        match rx.recv_async().await {
            Ok(Ok(line)) => Ok((Some(line), rx)),
            Ok(Err(e)) => Err(e.into()),
            Err(flume::RecvError::Disconnected) => Ok((None, rx)),
        }
    }

    /// Payload for the root route
    pub async fn summary(&self) -> Result<StoreSummary> {
        let store = self.store.clone();
        Ok(run_blocking(move || store.summary()).await?)
    }

    /// Cheap, possibly stale document count
    pub fn approx_doc_count(&self) -> u64 {
        self.store.approx_doc_count()
    }

    /// Encode a listing map as a JSON object
    pub fn encode_listing(docs: &Map<String, Value>) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(docs)?)
    }

    /// Close the store; must run once, after the listener has drained
    pub fn close(&self) -> Result<()> {
        self.store.close()?;
        log_info!("Store closed");
        Ok(())
    }
}

/// Run a store call on the blocking pool
async fn run_blocking<R, F>(f: F) -> std::result::Result<R, StoreError>
where
    R: Send + 'static,
    F: FnOnce() -> std::result::Result<R, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}
