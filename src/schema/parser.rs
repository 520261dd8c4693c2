//! Field-spec parser
//!
//! Field specs are colon-delimited token lists:
//!
//! ```text
//! column:type[:pk|primary_key][:auto|auto_increment][:notnull|required][:default=<literal>]
//! ```
//!
//! They are parsed exactly once, at table creation, into typed
//! `FieldDef`s. Nothing else in the crate looks at the token form.

use super::types::{FieldDef, TableSchema};
use crate::errors::{DbError, DbResult};
use crate::types::{unquote, ColumnType};

/// Flags found in the trailing tokens of one spec
#[derive(Debug, Default)]
struct SpecFlags {
    primary_key: bool,
    auto_increment: bool,
    required: bool,
    default: Option<String>,
}

fn parse_flags(column: &str, tokens: &[&str]) -> DbResult<SpecFlags> {
    let mut flags = SpecFlags::default();

    for token in tokens {
        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "pk" | "primary_key" => flags.primary_key = true,
            "auto" | "auto_increment" => flags.auto_increment = true,
            "notnull" | "required" => flags.required = true,
            _ if lower.starts_with("default=") => {
                // Keep the literal's case; only the keyword is case-insensitive.
                let literal = &token["default=".len()..];
                flags.default = Some(unquote(literal).to_string());
            }
            _ => {
                return Err(DbError::invalid_constraint(
                    column,
                    format!("unknown column option '{}'", token),
                ))
            }
        }
    }

    Ok(flags)
}

/// Parses a single field spec.
///
/// `has_primary_key` tracks whether an earlier field of the same table
/// already claimed the primary key.
fn parse_field(spec: &str, has_primary_key: bool) -> DbResult<FieldDef> {
    let tokens: Vec<&str> = spec.split(':').collect();
    if tokens.len() < 2 || tokens[0].is_empty() {
        return Err(DbError::InvalidArgument(format!(
            "invalid field definition '{}', expected column:type",
            spec
        )));
    }

    let column = tokens[0];
    let column_type: ColumnType = tokens[1].parse()?;
    let flags = parse_flags(column, &tokens[2..])?;

    if flags.primary_key && has_primary_key {
        return Err(DbError::MultiplePrimaryKeys(column.to_string()));
    }

    let field = FieldDef {
        column: column.to_string(),
        column_type,
        primary_key: flags.primary_key,
        auto_increment: flags.auto_increment,
        // Primary keys are implicitly required.
        required: flags.required || flags.primary_key,
        default: flags.default,
    };
    field.check()?;
    Ok(field)
}

/// Parses the field specs of a CREATE TABLE into a validated schema.
pub fn parse_table_schema<S: AsRef<str>>(name: &str, specs: &[S]) -> DbResult<TableSchema> {
    let mut fields: Vec<FieldDef> = Vec::with_capacity(specs.len());

    for spec in specs {
        let has_primary_key = fields.iter().any(|f| f.primary_key);
        let field = parse_field(spec.as_ref(), has_primary_key)?;
        if fields.iter().any(|f| f.column == field.column) {
            return Err(DbError::InvalidArgument(format!(
                "column '{}' is declared twice",
                field.column
            )));
        }
        fields.push(field);
    }

    if fields.is_empty() {
        return Err(DbError::InvalidArgument(
            "a table must define at least one column".into(),
        ));
    }

    Ok(TableSchema::new(name, fields))
}
