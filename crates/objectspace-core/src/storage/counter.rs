//! Counter-keyed collection
//!
//! Documents are stored under a `u64` sequence number assigned at insert
//! time. The next sequence number lives in a companion metadata table and
//! is advanced in the same write transaction as the insert, so ids are
//! never handed out twice, including across restarts.

use redb::{ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::config::StorageConfig;
use crate::storage::handle::DatabaseHandle;
use crate::storage::{DocumentStorage, StoreSummary, Visit};
use crate::types::{Document, DocumentId, StoreError};
use crate::{log_debug, log_info};

/// Metadata key holding the next sequence number
const SEQUENCE_KEY: &str = "next_id";

/// First id handed out in an empty collection
const FIRST_ID: u64 = 1;

/// Collection with store-assigned integer identifiers
pub struct CounterStorage {
    handle: DatabaseHandle,
    docs_table: String,
    meta_table: String,
    doc_count: AtomicU64,
}

impl CounterStorage {
    fn docs(&self) -> TableDefinition<'_, u64, &'static [u8]> {
        TableDefinition::new(&self.docs_table)
    }

    fn meta(&self) -> TableDefinition<'_, &'static str, u64> {
        TableDefinition::new(&self.meta_table)
    }

    /// Create both tables if missing and return the stored document count
    fn ensure_tables(&self) -> Result<u64, StoreError> {
        self.handle.with(|db| {
            let txn = db.begin_write()?;
            let count = {
                txn.open_table(self.meta())?;
                let docs = txn.open_table(self.docs())?;
                docs.len()?
            };
            txn.commit()?;
            Ok(count)
        })
    }
}

impl DocumentStorage for CounterStorage {
    fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let storage = Self {
            handle: DatabaseHandle::open(&config.data_dir)?,
            docs_table: config.collection.clone(),
            meta_table: format!("{}_meta", config.collection),
            doc_count: AtomicU64::new(0),
        };

        let count = storage
            .ensure_tables()
            .map_err(|e| StoreError::unavailable(storage.handle.path(), e))?;
        storage.doc_count.store(count, Ordering::Relaxed);
        log_info!("Collection '{}' ready with {} documents", config.collection, count);

        Ok(storage)
    }

    fn insert(&self, doc: &Document) -> Result<DocumentId, StoreError> {
        let raw = serde_json::to_vec(doc).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;

        let id = self.handle.with(|db| {
            let txn = db.begin_write()?;
            let id = {
                let mut meta = txn.open_table(self.meta())?;
                let id = meta
                    .get(SEQUENCE_KEY)?
                    .map(|guard| guard.value())
                    .unwrap_or(FIRST_ID);
                meta.insert(SEQUENCE_KEY, id + 1)?;

                let mut docs = txn.open_table(self.docs())?;
                docs.insert(id, raw.as_slice())?;
                id
            };
            txn.commit()?;
            Ok(id)
        })?;

        self.doc_count.fetch_add(1, Ordering::Relaxed);
        log_debug!("Inserted document {} ({} bytes)", id, raw.len());
        Ok(DocumentId::Seq(id))
    }

    fn for_each_all(&self, visit: Visit<'_>) -> Result<(), StoreError> {
        self.handle.with(|db| {
            let txn = db.begin_read()?;
            let docs = txn.open_table(self.docs())?;
            for entry in docs.iter()? {
                let (key, value) = entry?;
                if !visit(&DocumentId::Seq(key.value()), value.value()) {
                    break;
                }
            }
            Ok(())
        })
    }

    fn approx_doc_count(&self) -> u64 {
        self.doc_count.load(Ordering::Relaxed)
    }

    fn summary(&self) -> Result<StoreSummary, StoreError> {
        Ok(StoreSummary::DocCount {
            doc_count: self.approx_doc_count(),
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        self.handle.close()
    }
}
