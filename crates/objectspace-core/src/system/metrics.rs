//! Metrics collection for the document service
//!
//! Counters are registered once in the default Prometheus registry and
//! rendered in the text exposition format on demand.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

use crate::types::{Error, Result};

/// Counters describing document traffic
pub struct Metrics {
    /// Total number of documents inserted
    pub documents_inserted: IntCounter,
    /// Number of scans started, labelled by kind (`all`, `page`, `filter`)
    pub scans_started: IntCounterVec,
    /// Documents returned by scans
    pub documents_returned: IntCounter,
    /// Stored documents skipped because they did not decode
    pub documents_skipped: IntCounter,
    /// Scans stopped early because the client went away
    pub scans_cancelled: IntCounter,
    /// Requests answered with an error status, labelled by class (`client`, `server`)
    pub request_errors: IntCounterVec,
}

impl Metrics {
    /// Create new metrics instance
    fn new() -> Result<Self> {
        Ok(Self {
            documents_inserted: register_int_counter!(
                "objectspace_documents_inserted_total",
                "Total number of documents inserted"
            )?,
            scans_started: register_int_counter_vec!(
                "objectspace_scans_started_total",
                "Number of collection scans started",
                &["kind"]
            )?,
            documents_returned: register_int_counter!(
                "objectspace_documents_returned_total",
                "Documents returned by collection scans"
            )?,
            documents_skipped: register_int_counter!(
                "objectspace_documents_skipped_total",
                "Stored documents skipped because they failed to decode"
            )?,
            scans_cancelled: register_int_counter!(
                "objectspace_scans_cancelled_total",
                "Scans stopped before completion because the client disconnected"
            )?,
            request_errors: register_int_counter_vec!(
                "objectspace_request_errors_total",
                "Requests answered with an error status",
                &["class"]
            )?,
        })
    }

    /// Get the global metrics instance
    pub fn global() -> &'static Metrics {
        static INSTANCE: Lazy<Metrics> = Lazy::new(|| {
            Metrics::new().expect("Failed to initialize metrics")
        });
        &INSTANCE
    }
}

/// Render every registered metric in the Prometheus text format
pub fn render_metrics() -> Result<String> {
    // make sure our counters exist even before the first request
    let _ = Metrics::global();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics are not UTF-8: {}", e)))
}
