//! Sequence manager for auto-increment primary keys
//!
//! Counters live in the `serials` table of the reserved `_system`
//! database, stored with the same schema/data artifact convention as user
//! tables but never visible through a user catalog.
//!
//! # Invariants
//!
//! - A counter starts at `SEQUENCE_SEED` when its table is created
//! - A counter only moves forward; deleting records never decrements it
//! - Entries are keyed by `<db>.<table>`, so equally named tables in two
//!   databases never share a counter

use tracing::{debug, info};

use crate::errors::{DbError, DbResult};
use crate::schema::{FieldDef, TableSchema};
use crate::storage::{write_json_atomic, RecordStore, StorageLayout, SYSTEM_DATABASE};
use crate::types::{ColumnType, Record, Value};

/// System table holding one row per auto-increment table
pub const SEQUENCE_TABLE: &str = "serials";

/// First value handed out for a fresh table
pub const SEQUENCE_SEED: i64 = 1;

const TABLE_COLUMN: &str = "table";
const VALUE_COLUMN: &str = "value";

/// One persisted counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    /// Qualified table name (`<db>.<table>`)
    pub table: String,
    /// Next value to hand out
    pub value: i64,
}

impl SequenceEntry {
    fn from_record(record: &Record, path: &str) -> DbResult<Self> {
        let corrupt = |reason: &str| DbError::CorruptData {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let table = match record.get(TABLE_COLUMN) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(corrupt("sequence entry without a table name")),
        };
        let value = match record.get(VALUE_COLUMN) {
            Some(Value::Integer(v)) => *v,
            _ => return Err(corrupt("sequence entry without an integer value")),
        };

        Ok(Self { table, value })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(TABLE_COLUMN.into(), Value::String(self.table.clone()));
        record.insert(VALUE_COLUMN.into(), Value::Integer(self.value));
        record
    }
}

/// Schema of the system sequence table
pub fn sequence_table_schema() -> TableSchema {
    TableSchema::new(
        SEQUENCE_TABLE,
        vec![
            FieldDef::primary_key(TABLE_COLUMN, ColumnType::String),
            FieldDef::new(VALUE_COLUMN, ColumnType::Integer)
                .with_default(SEQUENCE_SEED.to_string())
                .required(),
        ],
    )
}

fn qualified(db: &str, table: &str) -> String {
    format!("{}.{}", db, table)
}

/// Persistent per-table counters.
///
/// Every method is a read-modify-write of the whole `serials` collection;
/// callers serialize them with the engine's write gate.
#[derive(Debug, Clone)]
pub struct SequenceManager {
    layout: StorageLayout,
    records: RecordStore,
}

impl SequenceManager {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            records: RecordStore::new(layout.clone()),
            layout,
        }
    }

    /// Creates the system database and the sequence table if missing.
    pub fn bootstrap(&self) -> DbResult<()> {
        let schema_path = self.layout.schema_path(SYSTEM_DATABASE, SEQUENCE_TABLE);
        if !schema_path.exists() {
            write_json_atomic(&schema_path, &sequence_table_schema())?;
        }

        let data_path = self.layout.data_path(SYSTEM_DATABASE, SEQUENCE_TABLE);
        if !data_path.exists() {
            self.records.write_all(SYSTEM_DATABASE, SEQUENCE_TABLE, &[])?;
        }

        Ok(())
    }

    fn load(&self) -> DbResult<Vec<SequenceEntry>> {
        let path = self
            .layout
            .data_path(SYSTEM_DATABASE, SEQUENCE_TABLE)
            .display()
            .to_string();
        self.records
            .read_all(SYSTEM_DATABASE, SEQUENCE_TABLE)?
            .iter()
            .map(|r| SequenceEntry::from_record(r, &path))
            .collect()
    }

    fn store(&self, entries: &[SequenceEntry]) -> DbResult<()> {
        let records: Vec<Record> = entries.iter().map(SequenceEntry::to_record).collect();
        self.records
            .write_all(SYSTEM_DATABASE, SEQUENCE_TABLE, &records)
    }

    /// Registers `db.table` with a counter at the seed value.
    ///
    /// A stale entry left for the same name is reset.
    pub fn register(&self, db: &str, table: &str) -> DbResult<()> {
        let key = qualified(db, table);
        let mut entries = self.load()?;
        entries.retain(|e| e.table != key);
        entries.push(SequenceEntry {
            table: key.clone(),
            value: SEQUENCE_SEED,
        });
        self.store(&entries)?;
        info!(sequence = %key, "registered sequence");
        Ok(())
    }

    /// Removes the counter of `db.table`, if any.
    pub fn deregister(&self, db: &str, table: &str) -> DbResult<()> {
        let key = qualified(db, table);
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.table != key);
        if entries.len() != before {
            self.store(&entries)?;
            info!(sequence = %key, "deregistered sequence");
        }
        Ok(())
    }

    /// Removes the counters of every table of `db`.
    pub fn deregister_database(&self, db: &str) -> DbResult<()> {
        let prefix = format!("{}.", db);
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| !e.table.starts_with(&prefix));
        if entries.len() != before {
            self.store(&entries)?;
            info!(db, removed = before - entries.len(), "deregistered sequences");
        }
        Ok(())
    }

    /// Returns the current value of `db.table` and persists `current + 1`.
    ///
    /// Fails with `NotFound` if the table never registered a sequence.
    pub fn next(&self, db: &str, table: &str) -> DbResult<i64> {
        let key = qualified(db, table);
        let mut entries = self.load()?;
        let entry = entries
            .iter_mut()
            .find(|e| e.table == key)
            .ok_or_else(|| DbError::NotFound(format!("no sequence registered for '{}'", key)))?;

        let value = entry.value;
        entry.value = value
            .checked_add(1)
            .ok_or_else(|| DbError::InvalidArgument(format!("sequence '{}' exhausted", key)))?;
        self.store(&entries)?;

        debug!(sequence = %key, value, "allocated sequence value");
        Ok(value)
    }

    /// Returns the next value of `db.table` without consuming it.
    pub fn peek(&self, db: &str, table: &str) -> DbResult<Option<i64>> {
        let key = qualified(db, table);
        Ok(self
            .load()?
            .into_iter()
            .find(|e| e.table == key)
            .map(|e| e.value))
    }
}
