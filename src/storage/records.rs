//! Record store
//!
//! Owns the per-table record collections. Higher-level mutation (insert,
//! delete, sequence allocation) is expressed as read-modify-write over the
//! two primitives here.

use tracing::{debug, warn};

use super::atomic::{read_if_exists, remove_if_exists, write_json_atomic};
use super::layout::StorageLayout;
use crate::errors::{DbError, DbResult};
use crate::types::Record;

/// Reads and overwrites whole record collections.
#[derive(Debug, Clone)]
pub struct RecordStore {
    layout: StorageLayout,
}

impl RecordStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Returns every record of `db.table`.
    ///
    /// A missing data artifact reads as an empty table. An artifact that
    /// exists but is not a JSON array of flat records fails with
    /// `CorruptData`; it is never coerced to empty.
    pub fn read_all(&self, db: &str, table: &str) -> DbResult<Vec<Record>> {
        let path = self.layout.data_path(db, table);
        let content = match read_if_exists(&path)? {
            Some(content) => content,
            None => return Ok(Vec::new()),
        };

        let records: Vec<Record> = serde_json::from_str(&content).map_err(|e| {
            warn!(db, table, error = %e, "data artifact failed to parse");
            DbError::CorruptData {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!(db, table, rows = records.len(), "read records");
        Ok(records)
    }

    /// Atomically replaces the whole record collection of `db.table`.
    pub fn write_all(&self, db: &str, table: &str, records: &[Record]) -> DbResult<()> {
        let path = self.layout.data_path(db, table);
        write_json_atomic(&path, records)?;
        debug!(db, table, rows = records.len(), "wrote records");
        Ok(())
    }

    /// Deletes the data artifact of `db.table`.
    pub fn remove(&self, db: &str, table: &str) -> DbResult<()> {
        remove_if_exists(&self.layout.data_path(db, table))
    }
}
