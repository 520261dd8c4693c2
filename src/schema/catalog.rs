//! Schema catalog
//!
//! Registry of databases and, for the active database, its table schemas.
//! The catalog is rebuilt from the schema areas on disk by `load`; the
//! in-memory view is a cache of what the artifacts say, never the other
//! way round.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use super::parser::parse_table_schema;
use super::types::TableSchema;
use crate::errors::{DbError, DbResult};
use crate::sequence::SequenceManager;
use crate::storage::{
    read_if_exists, remove_if_exists, validate_name, write_json_atomic, RecordStore,
    StorageLayout,
};

/// Per-session view of databases and the active database's tables.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    layout: StorageLayout,
    /// Known databases, sorted
    databases: Vec<String>,
    /// Active database
    current: Option<String>,
    /// Tables of the active database
    tables: BTreeMap<String, TableSchema>,
    /// Tables of the active database whose schema artifact does not load
    corrupt: BTreeMap<String, DbError>,
}

impl SchemaCatalog {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            databases: Vec::new(),
            current: None,
            tables: BTreeMap::new(),
            corrupt: BTreeMap::new(),
        }
    }

    /// Known databases, sorted; the system database is never listed.
    pub fn databases(&self) -> &[String] {
        &self.databases
    }

    /// Name of the active database
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Name of the active database, or `NoDatabaseSelected`
    pub fn require_current(&self) -> DbResult<&str> {
        self.current.as_deref().ok_or(DbError::NoDatabaseSelected)
    }

    /// Table names of the active database, sorted.
    ///
    /// Fails with `CorruptSchema` if any table of the database does not load.
    pub fn table_names(&self) -> DbResult<Vec<String>> {
        self.require_current()?;
        if let Some(err) = self.corrupt.values().next() {
            return Err(err.clone());
        }
        Ok(self.tables.keys().cloned().collect())
    }

    /// Looks up a table of the active database.
    pub fn table(&self, name: &str) -> DbResult<&TableSchema> {
        self.require_current()?;
        if let Some(err) = self.corrupt.get(name) {
            return Err(err.clone());
        }
        self.tables
            .get(name)
            .ok_or_else(|| DbError::UnknownTable(name.to_string()))
    }

    /// Returns true if the active database has an artifact for `name`,
    /// loadable or not.
    fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name) || self.corrupt.contains_key(name)
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.databases.iter().any(|d| d == name)
    }

    /// Rescans the schema areas.
    ///
    /// A missing or empty structure yields zero databases/tables. A schema
    /// artifact that is present but does not parse is kept aside, and any
    /// access to that table fails with `CorruptSchema`; the other tables
    /// stay usable. A selection whose database has disappeared is cleared.
    pub fn load(&mut self) -> DbResult<()> {
        self.databases = list_databases(&self.layout.structure_root())?;

        if let Some(db) = &self.current {
            if !self.layout.database_exists(db) {
                warn!(db = %db, "active database no longer exists");
                self.current = None;
            }
        }

        let Some(db) = self.current.clone() else {
            self.tables.clear();
            self.corrupt.clear();
            return Ok(());
        };

        (self.tables, self.corrupt) = load_tables(&self.layout, &db)?;
        Ok(())
    }

    /// Makes `name` the active database.
    ///
    /// Fails with `UnknownDatabase` if either storage area is missing. On
    /// any failure the previous selection stays in place.
    pub fn select(&mut self, name: &str) -> DbResult<()> {
        if validate_name("database", name).is_err() || !self.layout.database_exists(name) {
            return Err(DbError::UnknownDatabase(name.to_string()));
        }

        let (tables, corrupt) = load_tables(&self.layout, name)?;
        self.databases = list_databases(&self.layout.structure_root())?;
        self.current = Some(name.to_string());
        self.tables = tables;
        self.corrupt = corrupt;
        Ok(())
    }

    /// Creates the schema and data areas of a new database.
    pub fn create_database(&mut self, name: &str) -> DbResult<()> {
        validate_name("database", name)?;
        self.load()?;
        if self.has_database(name) || self.layout.data_dir(name).exists() {
            return Err(DbError::AlreadyExists(format!("database '{}'", name)));
        }

        let data_dir = self.layout.data_dir(name);
        let schema_dir = self.layout.schema_dir(name);
        fs::create_dir_all(&data_dir)?;
        if let Err(e) = fs::create_dir_all(&schema_dir) {
            let _ = fs::remove_dir(&data_dir);
            return Err(e.into());
        }

        info!(db = name, "created database");
        self.load()
    }

    /// Recursively deletes both storage areas of a database, and its
    /// sequence entries. Clears the selection if it was active.
    pub fn drop_database(&mut self, name: &str, sequences: &SequenceManager) -> DbResult<()> {
        if validate_name("database", name).is_err() {
            return Err(DbError::UnknownDatabase(name.to_string()));
        }
        let schema_dir = self.layout.schema_dir(name);
        let data_dir = self.layout.data_dir(name);
        if !schema_dir.exists() && !data_dir.exists() {
            return Err(DbError::UnknownDatabase(name.to_string()));
        }

        // Schema area first: once it is gone the database is unlisted.
        remove_dir_if_exists(&schema_dir)?;
        remove_dir_if_exists(&data_dir)?;
        sequences.deregister_database(name)?;

        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        info!(db = name, "dropped database");
        self.load()
    }

    /// Defines a table in the active database from field specs.
    ///
    /// The schema is fully parsed and validated before anything is
    /// written. The empty record collection and the sequence entry are
    /// persisted before the schema artifact, so a table only becomes
    /// visible once everything it needs exists.
    pub fn create_table<S: AsRef<str>>(
        &mut self,
        name: &str,
        specs: &[S],
        records: &RecordStore,
        sequences: &SequenceManager,
    ) -> DbResult<TableSchema> {
        let db = self.require_current()?.to_string();
        validate_name("table", name)?;
        self.load()?;
        if self.has_table(name) {
            return Err(DbError::AlreadyExists(format!(
                "table '{}' in database '{}'",
                name, db
            )));
        }

        let schema = parse_table_schema(name, specs)?;

        records.write_all(&db, name, &[])?;
        if schema.has_auto_increment() {
            sequences.register(&db, name)?;
        }
        write_json_atomic(&self.layout.schema_path(&db, name), &schema)?;

        info!(db = %db, table = name, columns = schema.fields.len(), "created table");
        self.load()?;
        Ok(schema)
    }

    /// Deletes a table's schema and data artifacts and its sequence entry.
    ///
    /// A table whose schema artifact is corrupt can still be dropped.
    pub fn drop_table(
        &mut self,
        name: &str,
        records: &RecordStore,
        sequences: &SequenceManager,
    ) -> DbResult<()> {
        let db = self.require_current()?.to_string();
        self.load()?;
        if !self.has_table(name) {
            return Err(DbError::UnknownTable(name.to_string()));
        }

        remove_if_exists(&self.layout.schema_path(&db, name))?;
        records.remove(&db, name)?;
        sequences.deregister(&db, name)?;

        info!(db = %db, table = name, "dropped table");
        self.load()
    }
}

fn remove_dir_if_exists(path: &Path) -> DbResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DbError::Io(format!(
            "failed to remove '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Lists database directories below the structure root, sorted.
///
/// Hidden entries and reserved (`_`-prefixed) names are skipped.
fn list_databases(structure_root: &Path) -> DbResult<Vec<String>> {
    let entries = match fs::read_dir(structure_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut databases = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        databases.push(name);
    }

    databases.sort();
    Ok(databases)
}

type LoadedTables = (BTreeMap<String, TableSchema>, BTreeMap<String, DbError>);

/// Loads every schema artifact of `db`, splitting off the corrupt ones.
fn load_tables(layout: &StorageLayout, db: &str) -> DbResult<LoadedTables> {
    let schema_dir = layout.schema_dir(db);
    let entries = match fs::read_dir(&schema_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok((BTreeMap::new(), BTreeMap::new()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut tables = BTreeMap::new();
    let mut corrupt = BTreeMap::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();

        // Skips temp files and anything that is not a schema artifact.
        let Some(table) = StorageLayout::table_from_schema_file(&file_name) else {
            continue;
        };

        match load_schema_file(&entry.path(), table) {
            Ok(schema) => {
                tables.insert(table.to_string(), schema);
            }
            Err(e @ DbError::CorruptSchema { .. }) => {
                corrupt.insert(table.to_string(), e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok((tables, corrupt))
}

/// Loads a single schema artifact.
fn load_schema_file(path: &Path, table: &str) -> DbResult<TableSchema> {
    let corrupt = |reason: String| {
        warn!(path = %path.display(), reason = %reason, "corrupt schema artifact");
        DbError::CorruptSchema {
            path: path.display().to_string(),
            reason,
        }
    };

    let content = read_if_exists(path)?
        .ok_or_else(|| corrupt("schema artifact disappeared while loading".into()))?;

    let schema: TableSchema =
        serde_json::from_str(&content).map_err(|e| corrupt(format!("invalid JSON: {}", e)))?;

    if schema.name != table {
        return Err(corrupt(format!(
            "schema names table '{}' but file belongs to '{}'",
            schema.name, table
        )));
    }

    schema
        .validate_structure()
        .map_err(|e| corrupt(e.to_string()))?;

    Ok(schema)
}
