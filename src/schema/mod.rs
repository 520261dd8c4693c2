//! Schema subsystem for realdb
//!
//! Schemas are mandatory, declared once at CREATE TABLE and immutable
//! afterwards (there is no ALTER TABLE).
//!
//! # Design Principles
//!
//! - Field specs are parsed once into typed definitions
//! - Definition rules are enforced before anything is persisted
//! - Loaded artifacts are re-validated; corrupt ones are reported

mod catalog;
mod parser;
mod types;

pub use catalog::SchemaCatalog;
pub use parser::parse_table_schema;
pub use types::{FieldDef, TableSchema};
