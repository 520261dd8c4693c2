//! On-disk layout
//!
//! ```text
//! <root>/structure/<db>/<table>_schema.json
//! <root>/data/<db>/<table>_data.json
//! <root>/users/users.json
//! ```
//!
//! The reserved `_system` database uses the same convention for the
//! sequence table.

use std::path::{Path, PathBuf};

use crate::errors::{DbError, DbResult};

/// Reserved database holding system tables
pub const SYSTEM_DATABASE: &str = "_system";

const STRUCTURE_DIR: &str = "structure";
const DATA_DIR: &str = "data";
const USERS_DIR: &str = "users";
const USERS_FILE: &str = "users.json";
const SCHEMA_SUFFIX: &str = "_schema.json";
const DATA_SUFFIX: &str = "_data.json";

/// Resolves artifact paths below a data directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent of every database's schema area
    pub fn structure_root(&self) -> PathBuf {
        self.root.join(STRUCTURE_DIR)
    }

    /// Parent of every database's data area
    pub fn data_root(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn schema_dir(&self, db: &str) -> PathBuf {
        self.structure_root().join(db)
    }

    pub fn data_dir(&self, db: &str) -> PathBuf {
        self.data_root().join(db)
    }

    pub fn schema_path(&self, db: &str, table: &str) -> PathBuf {
        self.schema_dir(db).join(format!("{}{}", table, SCHEMA_SUFFIX))
    }

    pub fn data_path(&self, db: &str, table: &str) -> PathBuf {
        self.data_dir(db).join(format!("{}{}", table, DATA_SUFFIX))
    }

    pub fn users_path(&self) -> PathBuf {
        self.root.join(USERS_DIR).join(USERS_FILE)
    }

    /// Exclusive lock file serializing writers
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(super::lock::LOCK_FILE)
    }

    /// A database is usable only when both storage areas exist.
    pub fn database_exists(&self, db: &str) -> bool {
        self.schema_dir(db).is_dir() && self.data_dir(db).is_dir()
    }

    /// Extracts the table name from a schema artifact file name.
    pub fn table_from_schema_file(file_name: &str) -> Option<&str> {
        file_name
            .strip_suffix(SCHEMA_SUFFIX)
            .filter(|name| !name.is_empty())
    }
}

/// Checks a database, table or account name.
///
/// Names must be non-empty ASCII alphanumerics, `_` or `-`, and must not
/// start with `_`, which is reserved for system objects.
pub fn validate_name(kind: &str, name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::InvalidArgument(format!("{} name cannot be empty", kind)));
    }
    if name.starts_with('_') {
        return Err(DbError::InvalidArgument(format!(
            "{} name '{}' is reserved",
            kind, name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DbError::InvalidArgument(format!(
            "{} name '{}' may only contain letters, digits, '_' and '-'",
            kind, name
        )));
    }
    Ok(())
}
