//! Data directory lock
//!
//! Every mutation holds an exclusive advisory lock on `<root>/LOCK` for its
//! whole duration, so writers in separate processes sharing one data
//! directory run one at a time. The lock is released when the handle is
//! dropped.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs4::fs_std::FileExt;
use tracing::debug;

use crate::errors::{DbError, DbResult};

pub const LOCK_FILE: &str = "LOCK";

/// Held exclusive lock on a data directory
#[derive(Debug)]
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Blocks until the exclusive lock on `path` is acquired.
    pub fn acquire(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                DbError::Io(format!("failed to open lock '{}': {}", path.display(), e))
            })?;

        FileExt::lock_exclusive(&file).map_err(|e| {
            DbError::Io(format!("failed to lock '{}': {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "acquired directory lock");
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_lock_file_created() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE);

        let lock = DirLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);

        // Released locks can be taken again.
        DirLock::acquire(&path).unwrap();
    }

    /// A second handle waits until the first one is dropped.
    #[test]
    fn test_second_holder_waits() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        let held = DirLock::acquire(&path).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter_path = path.clone();
        let waiter = thread::spawn(move || {
            let _lock = DirLock::acquire(&waiter_path).unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(held);
        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        waiter.join().unwrap();
    }
}
