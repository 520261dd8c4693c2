//! Scalar types for realdb
//!
//! Records hold a closed set of scalar values. Every column declares one
//! of four types, and literals coming from clients are checked and
//! converted against that type here before they reach storage.
//!
//! - `Value`: tagged scalar (null, boolean, integer, float, string)
//! - `ColumnType`: declared column type
//! - `validate` / `coerce`: the type validator

mod validator;
mod value;

pub use validator::{coerce, parse_bool, parse_float, unquote, validate, validate_literal};
pub use value::{ColumnType, Record, Value};
