//! Storage subsystem for realdb
//!
//! Every database owns two storage areas: a schema area holding one schema
//! artifact per table, and a data area holding one record artifact per
//! table. Both are plain JSON files.
//!
//! # Design Principles
//!
//! - Whole-file rewrite is the only mutation primitive
//! - Rewrites are atomic: temp file, fsync, rename, directory fsync
//! - An absent artifact reads as empty; an unparseable one is an error
//! - Writers across processes are serialized by the directory lock

mod atomic;
mod layout;
mod lock;
mod records;

pub use atomic::{read_if_exists, remove_if_exists, write_json_atomic};
pub use layout::{validate_name, StorageLayout, SYSTEM_DATABASE};
pub use lock::DirLock;
pub use records::RecordStore;
