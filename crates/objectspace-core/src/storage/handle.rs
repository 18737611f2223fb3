//! Shared database handle
//!
//! Both backends keep their collection in one redb file inside the data
//! directory. The handle can be closed exactly once; afterwards every
//! operation fails with [`StoreError::Closed`].

use parking_lot::RwLock;
use redb::Database;
use std::path::{Path, PathBuf};

use crate::types::StoreError;
use crate::{log_debug, log_info};

/// File name of the database inside the data directory
pub(crate) const DATABASE_FILE: &str = "objectspace.redb";

pub(crate) struct DatabaseHandle {
    path: PathBuf,
    db: RwLock<Option<Database>>,
}

impl DatabaseHandle {
    /// Open the database under `dir`, creating the directory and file if needed
    pub(crate) fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::unavailable(dir, e))?;

        let path = dir.join(DATABASE_FILE);
        let db = Database::create(&path).map_err(|e| StoreError::unavailable(&path, e))?;
        log_info!("Opened database at {:?}", path);

        Ok(Self {
            path,
            db: RwLock::new(Some(db)),
        })
    }

    /// Run `f` against the open database
    ///
    /// Holds a shared lock for the duration of `f`, so `close` waits for
    /// in-flight operations to finish.
    pub(crate) fn with<R>(
        &self,
        f: impl FnOnce(&Database) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        f(db)
    }

    /// Drop the database, flushing it to disk
    pub(crate) fn close(&self) -> Result<(), StoreError> {
        let db = self.db.write().take().ok_or(StoreError::Closed)?;
        drop(db);
        log_debug!("Closed database at {:?}", self.path);
        Ok(())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
