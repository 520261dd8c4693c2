//! Atomic JSON artifact writes
//!
//! Atomicity is achieved via:
//! 1. Write to `<file>.tmp`
//! 2. fsync temp file
//! 3. Rename temp to final (atomic on POSIX)
//! 4. fsync the parent directory so the rename is durable
//!
//! A reader therefore observes either the previous or the new artifact,
//! never a partially written one.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::{DbError, DbResult};

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serializes `value` as pretty JSON and atomically replaces `path` with it.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> DbResult<()> {
    let content = serde_json::to_string_pretty(value)?;

    let parent = path
        .parent()
        .ok_or_else(|| DbError::Io(format!("no parent directory for '{}'", path.display())))?;
    fs::create_dir_all(parent)?;

    let temp_path = temp_path_for(path);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| DbError::Io(format!("failed to create '{}': {}", temp_path.display(), e)))?;

    file.write_all(content.as_bytes())
        .map_err(|e| DbError::Io(format!("failed to write '{}': {}", temp_path.display(), e)))?;
    file.sync_all()
        .map_err(|e| DbError::Io(format!("failed to fsync '{}': {}", temp_path.display(), e)))?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(DbError::Io(format!(
            "failed to commit '{}': {}",
            path.display(),
            e
        )));
    }

    // Directory fsync is best effort; not every platform supports it.
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Reads an artifact, returning `None` if it does not exist.
pub fn read_if_exists(path: &Path) -> DbResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DbError::Io(format!(
            "failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Removes an artifact; a missing file is not an error.
pub fn remove_if_exists(path: &Path) -> DbResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DbError::Io(format!(
            "failed to remove '{}': {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("items.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();

        let content = read_if_exists(&path).unwrap().unwrap();
        let items: Vec<i32> = serde_json::from_str(&content).unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_overwrite_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("items.json");

        write_json_atomic(&path, &vec!["a"]).unwrap();
        write_json_atomic(&path, &vec!["b", "c"]).unwrap();

        let content = read_if_exists(&path).unwrap().unwrap();
        let items: Vec<String> = serde_json::from_str(&content).unwrap();
        assert_eq!(items, vec!["b", "c"]);
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        assert!(read_if_exists(&tmp.path().join("absent.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_remove_missing_file_is_ok() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.json");
        assert!(remove_if_exists(&path).is_ok());

        write_json_atomic(&path, &0).unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }
}
