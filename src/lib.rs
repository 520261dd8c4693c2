//! realdb - a small multi-tenant record store
//!
//! Tables have a declared schema, records persist as JSON artifacts per
//! table, and every account holds capabilities per database.

pub mod auth;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod schema;
pub mod sequence;
pub mod storage;
pub mod types;

pub use config::Config;
pub use engine::{Engine, Projection, ResultSet, Session};
pub use errors::{DbError, DbResult};
