//! Insert pipeline
//!
//! Rows arrive as colon-delimited literal lists in declaration order.
//! Every row of a batch is validated before anything is allocated or
//! written:
//!
//! 1. more literals than fields fails with `TooManyValues`
//! 2. a user-supplied primary key must be present, well typed and unique
//!    against both the stored records and the earlier rows of the batch
//! 3. other fields take the supplied literal, else the default, else null
//!
//! Auto-increment keys are left unset here; the engine fills them from
//! the sequence manager once the whole batch has validated.

use crate::errors::{DbError, DbResult};
use crate::schema::{FieldDef, TableSchema};
use crate::types::{coerce, unquote, Record, Value};

/// Splits a row into literals on `:`.
///
/// A literal opening with a quote runs to the matching quote, so quoted
/// strings may contain `:`.
pub(crate) fn split_row(row: &str) -> Vec<&str> {
    let mut literals = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in row.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') if i == start => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ':') => {
                literals.push(&row[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    literals.push(&row[start..]);
    literals
}

/// Validates a batch of rows against `schema` and `existing`.
///
/// Returns one record per row, without auto-increment keys.
pub(crate) fn prepare_rows<S: AsRef<str>>(
    schema: &TableSchema,
    rows: &[S],
    existing: &[Record],
) -> DbResult<Vec<Record>> {
    let pk = schema.primary_key();
    let mut prepared: Vec<Record> = Vec::with_capacity(rows.len());

    for row in rows {
        let record = prepare_row(schema, row.as_ref())?;

        if let Some(pk) = pk.filter(|pk| !pk.auto_increment) {
            let key = record.get(&pk.column).unwrap_or(&Value::Null);
            let taken = existing
                .iter()
                .chain(prepared.iter())
                .any(|r| r.get(&pk.column) == Some(key));
            if taken {
                return Err(DbError::DuplicateKey(key.to_string()));
            }
        }

        prepared.push(record);
    }

    Ok(prepared)
}

fn prepare_row(schema: &TableSchema, row: &str) -> DbResult<Record> {
    let literals = split_row(row);
    if literals.len() > schema.fields.len() {
        return Err(DbError::TooManyValues {
            got: literals.len(),
            expected: schema.fields.len(),
        });
    }

    let mut record = Record::new();
    for (i, field) in schema.fields.iter().enumerate() {
        let literal = literals.get(i).map(|l| unquote(l)).unwrap_or("");

        if field.auto_increment {
            if !literal.is_empty() {
                return Err(DbError::InvalidArgument(format!(
                    "column '{}' is auto-increment and cannot be set",
                    field.column
                )));
            }
            continue;
        }

        let value = if literal.is_empty() {
            if field.primary_key {
                return Err(DbError::MissingPrimaryKey(field.column.clone()));
            }
            default_value(field)?
        } else {
            typed_value(field, literal)?
        };
        record.insert(field.column.clone(), value);
    }

    Ok(record)
}

fn typed_value(field: &FieldDef, literal: &str) -> DbResult<Value> {
    coerce(literal, field.column_type)
        .ok_or_else(|| DbError::type_mismatch(&field.column, field.column_type, literal))
}

fn default_value(field: &FieldDef) -> DbResult<Value> {
    match field.default.as_deref() {
        Some(default) if !default.is_empty() => typed_value(field, default),
        _ => Ok(Value::Null),
    }
}
