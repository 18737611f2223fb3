//! Storage layer for the Objectspace document service
//!
//! This module provides the storage abstraction that lets the document
//! service run against different persistence designs while keeping one
//! consistent set of collection operations.

use serde::Serialize;

use crate::core::config::StorageConfig;
use crate::types::{Document, DocumentId, PageSpec, StoreError};

/// Visitor over `(identifier, raw bytes)`; returning `false` stops the scan
pub type Visit<'a> = &'a mut dyn FnMut(&DocumentId, &[u8]) -> bool;

/// Trait for document storage implementations
pub trait DocumentStorage: Send + Sync {
    /// Open the collection described by `config`, creating it if absent
    fn open(config: &StorageConfig) -> Result<Self, StoreError>
    where
        Self: Sized;

    /// Persist a document and return its identifier
    fn insert(&self, doc: &Document) -> Result<DocumentId, StoreError>;

    /// Visit every stored document in store order
    fn for_each_all(&self, visit: Visit<'_>) -> Result<(), StoreError>;

    /// Visit the documents placed on `page`
    ///
    /// Placement hashes the identifier, so for a fixed total the pages are
    /// disjoint and together cover the collection.
    fn for_each_page(&self, page: PageSpec, visit: Visit<'_>) -> Result<(), StoreError> {
        self.for_each_all(&mut |id, raw| {
            if page.contains(id) {
                visit(id, raw)
            } else {
                true
            }
        })
    }

    /// Cheap document count; may lag concurrent writes
    fn approx_doc_count(&self) -> u64;

    /// Payload for the root route
    fn summary(&self) -> Result<StoreSummary, StoreError>;

    /// Flush and release the handle; every later call fails with `Closed`
    fn close(&self) -> Result<(), StoreError>;
}

/// Root route payload, shaped per backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoreSummary {
    /// Counter backend: approximate document count
    DocCount {
        /// Approximate number of documents
        doc_count: u64,
    },
    /// Keyed backend: bucket statistics
    Size {
        /// Statistics of the bucket
        size: BucketStats,
    },
}

/// Statistics of a keyed bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    /// Number of keys in the bucket
    pub key_count: u64,
    /// Height of the bucket's B-tree
    pub depth: u32,
    /// Leaf pages in use
    pub leaf_pages: u64,
    /// Branch pages in use
    pub branch_pages: u64,
    /// Bytes of stored keys and values
    pub stored_bytes: u64,
    /// Bytes of tree metadata
    pub metadata_bytes: u64,
    /// Bytes lost to fragmentation
    pub fragmented_bytes: u64,
}

/// Hash partitioning of identifiers into pages
pub mod partition;

/// Shared database handle with close-once semantics
mod handle;

/// Counter-keyed collection
pub mod counter;

/// Content-keyed transactional bucket
pub mod keyed;

/// Re-export main storage types
pub use counter::CounterStorage;
pub use keyed::{KeyedStorage, ReadBucket, WriteBucket};

/// Helper trait that combines all requirements for storage implementations
/// This cleans up generic bounds throughout the codebase
pub trait StorageImpl: DocumentStorage + Send + Sync + 'static {}

/// Blanket implementation for any type that meets the requirements
impl<T> StorageImpl for T where T: DocumentStorage + Send + Sync + 'static {}
