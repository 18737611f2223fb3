//! Content-keyed transactional bucket
//!
//! Documents are stored under the value of their `uuid` field; inserting an
//! existing key replaces the previous body. Access goes through scoped
//! transactions: [`KeyedStorage::view`] reads one consistent snapshot and
//! [`KeyedStorage::update`] serializes against other writers without
//! blocking readers.

use redb::{ReadOnlyTable, ReadableTable, ReadableTableMetadata, Table, TableDefinition};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::config::StorageConfig;
use crate::storage::handle::DatabaseHandle;
use crate::storage::{BucketStats, DocumentStorage, StoreSummary, Visit};
use crate::types::{Document, DocumentId, StoreError};
use crate::{log_debug, log_info, log_warn};

/// Field holding the document key
pub const KEY_FIELD: &str = "uuid";

/// Read-only view of the bucket inside a read transaction
pub struct ReadBucket {
    table: ReadOnlyTable<&'static str, &'static [u8]>,
}

impl ReadBucket {
    /// Raw bytes stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.table.get(key)?.map(|guard| guard.value().to_vec()))
    }

    /// Visit every entry in key order
    pub fn for_each(&self, visit: Visit<'_>) -> Result<(), StoreError> {
        for entry in self.table.iter()? {
            let (key, value) = entry?;
            if !visit(&DocumentId::Key(key.value().to_string()), value.value()) {
                break;
            }
        }
        Ok(())
    }

    /// Number of keys
    pub fn len(&self) -> Result<u64, StoreError> {
        Ok(self.table.len()?)
    }

    /// True when the bucket holds no keys
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// B-tree statistics of the bucket
    pub fn stats(&self) -> Result<BucketStats, StoreError> {
        let stats = self.table.stats()?;
        Ok(BucketStats {
            key_count: self.table.len()?,
            depth: stats.tree_height(),
            leaf_pages: stats.leaf_pages(),
            branch_pages: stats.branch_pages(),
            stored_bytes: stats.stored_bytes(),
            metadata_bytes: stats.metadata_bytes(),
            fragmented_bytes: stats.fragmented_bytes(),
        })
    }
}

/// Writable view of the bucket inside a write transaction
pub struct WriteBucket<'txn> {
    table: Table<'txn, &'static str, &'static [u8]>,
}

impl WriteBucket<'_> {
    /// Store `value` under `key`; returns true when a previous value was replaced
    pub fn put(&mut self, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        Ok(self.table.insert(key, value)?.is_some())
    }

    /// Raw bytes stored under `key`, including writes made earlier in this transaction
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.table.get(key)?.map(|guard| guard.value().to_vec()))
    }
}

/// Bucket keyed by each document's `uuid` field
pub struct KeyedStorage {
    handle: DatabaseHandle,
    bucket: String,
    doc_count: AtomicU64,
}

impl KeyedStorage {
    fn definition(&self) -> TableDefinition<'_, &'static str, &'static [u8]> {
        TableDefinition::new(&self.bucket)
    }

    /// Run `f` inside a read transaction; it sees one snapshot throughout
    pub fn view<R>(
        &self,
        f: impl FnOnce(&ReadBucket) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        self.handle.with(|db| {
            let txn = db.begin_read()?;
            let bucket = ReadBucket {
                table: txn.open_table(self.definition())?,
            };
            f(&bucket)
        })
    }

    /// Run `f` inside a write transaction
    ///
    /// The transaction commits when `f` returns `Ok` and is rolled back
    /// otherwise.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut WriteBucket<'_>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        self.handle.with(|db| {
            let txn = db.begin_write()?;
            let result = {
                let mut bucket = WriteBucket {
                    table: txn.open_table(self.definition())?,
                };
                f(&mut bucket)
            };
            match result {
                Ok(value) => {
                    txn.commit()?;
                    Ok(value)
                }
                Err(e) => {
                    log_warn!("Rolling back write to bucket '{}': {}", self.bucket, e);
                    txn.abort()?;
                    Err(e)
                }
            }
        })
    }
}

impl DocumentStorage for KeyedStorage {
    fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let storage = Self {
            handle: DatabaseHandle::open(&config.data_dir)?,
            bucket: config.collection.clone(),
            doc_count: AtomicU64::new(0),
        };

        let path = storage.handle.path().to_path_buf();
        let count = storage
            .update(|_| Ok(()))
            .and_then(|_| storage.view(|bucket| bucket.len()))
            .map_err(|e| StoreError::unavailable(&path, e))?;
        storage.doc_count.store(count, Ordering::Relaxed);
        log_info!("Bucket '{}' ready with {} keys", config.collection, count);

        Ok(storage)
    }

    fn insert(&self, doc: &Document) -> Result<DocumentId, StoreError> {
        let key = match doc.get(KEY_FIELD) {
            Some(Value::String(key)) => key.clone(),
            Some(_) => {
                return Err(StoreError::InvalidDocument(format!(
                    "field '{}' must be a string",
                    KEY_FIELD
                )))
            }
            None => {
                return Err(StoreError::InvalidDocument(format!(
                    "missing required field '{}'",
                    KEY_FIELD
                )))
            }
        };
        let raw = serde_json::to_vec(doc).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;

        let replaced = self.update(|bucket| bucket.put(&key, &raw))?;
        if !replaced {
            self.doc_count.fetch_add(1, Ordering::Relaxed);
        }
        log_debug!("Stored document '{}' (replaced: {})", key, replaced);

        Ok(DocumentId::Key(key))
    }

    fn for_each_all(&self, visit: Visit<'_>) -> Result<(), StoreError> {
        self.view(|bucket| bucket.for_each(visit))
    }

    fn approx_doc_count(&self) -> u64 {
        self.doc_count.load(Ordering::Relaxed)
    }

    fn summary(&self) -> Result<StoreSummary, StoreError> {
        let size = self.view(|bucket| bucket.stats())?;
        Ok(StoreSummary::Size { size })
    }

    fn close(&self) -> Result<(), StoreError> {
        self.handle.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageSpec;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn open(dir: &std::path::Path) -> KeyedStorage {
        KeyedStorage::open(&StorageConfig {
            data_dir: dir.to_path_buf(),
            ..StorageConfig::default()
        })
        .unwrap()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn stored(store: &KeyedStorage, key: &str) -> Option<Value> {
        store
            .view(|bucket| bucket.get(key))
            .unwrap()
            .map(|raw| serde_json::from_slice(&raw).unwrap())
    }

    #[test]
    fn test_insert_upserts_by_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());

        let id = store.insert(&doc(json!({"uuid": "a", "x": "1"}))).unwrap();
        assert_eq!(id, DocumentId::Key("a".into()));
        store.insert(&doc(json!({"uuid": "a", "x": "2"}))).unwrap();

        assert_eq!(store.approx_doc_count(), 1);
        assert_eq!(stored(&store, "a"), Some(json!({"uuid": "a", "x": "2"})));
    }

    #[test]
    fn test_insert_requires_string_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());

        assert!(matches!(
            store.insert(&doc(json!({"x": 1}))),
            Err(StoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            store.insert(&doc(json!({"uuid": 17}))),
            Err(StoreError::InvalidDocument(_))
        ));
        assert_eq!(store.view(|bucket| bucket.len()).unwrap(), 0);
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());

        let result: Result<(), StoreError> = store.update(|bucket| {
            bucket.put("partial", b"{}")?;
            assert!(bucket.get("partial")?.is_some());
            Err(StoreError::InvalidDocument("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.view(|bucket| bucket.get("partial")).unwrap(), None);
    }

    #[test]
    fn test_view_reads_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.insert(&doc(json!({"uuid": "before"}))).unwrap();

        let keys = store
            .view(|bucket| {
                // written after the read transaction began
                store.insert(&doc(json!({"uuid": "after"})))?;
                let mut keys = Vec::new();
                bucket.for_each(&mut |id, _| {
                    keys.push(id.to_string());
                    true
                })?;
                Ok(keys)
            })
            .unwrap();

        assert_eq!(keys, vec!["before".to_string()]);
        assert!(stored(&store, "after").is_some());
    }

    #[test]
    fn test_pages_partition_the_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        for i in 0..60 {
            store.insert(&doc(json!({ "uuid": format!("doc-{}", i) }))).unwrap();
        }

        let total = 4;
        let mut seen = BTreeSet::new();
        let mut visits = 0;
        for index in 0..total {
            store
                .for_each_page(PageSpec::new(index, total).unwrap(), &mut |id, _| {
                    seen.insert(id.to_string());
                    visits += 1;
                    true
                })
                .unwrap();
        }
        assert_eq!(visits, 60);
        assert_eq!(seen.len(), 60);
    }

    #[test]
    fn test_summary_reports_bucket_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.insert(&doc(json!({"uuid": "a"}))).unwrap();
        store.insert(&doc(json!({"uuid": "b"}))).unwrap();

        match store.summary().unwrap() {
            StoreSummary::Size { size } => {
                assert_eq!(size.key_count, 2);
                assert!(size.stored_bytes > 0);
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }

    #[test]
    fn test_close_is_final() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.close().unwrap();
        assert!(matches!(store.view(|bucket| bucket.len()), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }
}
