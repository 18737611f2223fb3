//! Scan helpers: cancellation, accumulation and NDJSON encoding

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::storage::Visit;
use crate::system::Metrics;
use crate::types::{decode_document, DocumentId, StoreError};

/// Raises a shared flag when dropped
///
/// The request future owns the guard while a blocking scan holds the flag;
/// dropping the future (client disconnect) stops the scan at the next
/// document.
pub struct ScanGuard {
    cancelled: Arc<AtomicBool>,
}

impl ScanGuard {
    /// Create a guard with a lowered flag
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag observed by the scan
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }
}

impl Default for ScanGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Run `scan` and collect every decodable document into a map keyed by id
///
/// Documents that do not decode to a JSON object are skipped.
pub(crate) fn collect_documents(
    scan: impl FnOnce(Visit<'_>) -> Result<(), StoreError>,
    cancelled: &AtomicBool,
) -> Result<Map<String, Value>, StoreError> {
    let metrics = Metrics::global();
    let mut docs = Map::new();
    let mut stopped = false;

    scan(&mut |id, raw| {
        if cancelled.load(Ordering::Relaxed) {
            stopped = true;
            return false;
        }
        match decode_document(raw) {
            Some(doc) => {
                docs.insert(id.to_string(), Value::Object(doc));
            }
            None => metrics.documents_skipped.inc(),
        }
        true
    })?;

    if stopped {
        metrics.scans_cancelled.inc();
    }
    metrics.documents_returned.inc_by(docs.len() as u64);
    Ok(docs)
}

/// One NDJSON line `{"<id>": <raw>}` with the stored bytes copied verbatim
pub fn ndjson_line(id: &DocumentId, raw: &[u8]) -> Bytes {
    let key = Value::String(id.to_string()).to_string();
    let mut line = BytesMut::with_capacity(key.len() + raw.len() + 4);
    line.put_u8(b'{');
    line.put_slice(key.as_bytes());
    line.put_u8(b':');
    line.put_slice(raw);
    line.put_slice(b"}\n");
    line.freeze()
}
