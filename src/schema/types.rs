//! Schema type definitions
//!
//! A table schema is a name plus an ordered list of field definitions.
//! Declaration order is significant: it is the positional layout expected
//! by insert rows and the column order of `SELECT *`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DbError, DbResult};
use crate::types::{validate_literal, ColumnType};

fn is_false(b: &bool) -> bool {
    !*b
}

/// One column's declared type and constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Column name
    pub column: String,
    /// Declared type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    /// Key generated by the sequence manager (integer primary keys only)
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    /// Value must always resolve (input, default or generation)
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Default literal, type-checked at definition time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl FieldDef {
    /// Create a plain optional column
    pub fn new(column: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            column: column.into(),
            column_type,
            primary_key: false,
            auto_increment: false,
            required: false,
            default: None,
        }
    }

    /// Create a primary key column
    pub fn primary_key(column: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            primary_key: true,
            required: true,
            ..Self::new(column, column_type)
        }
    }

    /// Create an auto-increment integer primary key column
    pub fn auto_increment(column: impl Into<String>) -> Self {
        Self {
            auto_increment: true,
            ..Self::primary_key(column, ColumnType::Integer)
        }
    }

    /// Returns this definition with a default literal
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Returns this definition marked required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Checks the per-field constraint rules.
    pub fn check(&self) -> DbResult<()> {
        if self.column.is_empty() {
            return Err(DbError::InvalidArgument("column name cannot be empty".into()));
        }

        if self.auto_increment {
            if !self.primary_key {
                return Err(DbError::invalid_constraint(
                    &self.column,
                    "auto_increment requires the column to be the primary key",
                ));
            }
            if self.column_type != ColumnType::Integer {
                return Err(DbError::invalid_constraint(
                    &self.column,
                    "auto_increment requires type integer",
                ));
            }
        }

        if let Some(default) = &self.default {
            if !validate_literal(default, self.column_type) {
                return Err(DbError::type_mismatch(
                    &self.column,
                    self.column_type,
                    default.as_str(),
                ));
            }
        }

        if self.required && !self.primary_key && !self.has_default() {
            return Err(DbError::invalid_constraint(
                &self.column,
                "a required column needs a non-empty default value",
            ));
        }

        if self.primary_key && !self.required {
            return Err(DbError::invalid_constraint(
                &self.column,
                "a primary key is always required",
            ));
        }

        Ok(())
    }

    /// Returns true if a non-empty default literal is declared
    pub fn has_default(&self) -> bool {
        self.default.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Complete table schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Field definitions in declaration order
    pub fields: Vec<FieldDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Returns the primary key field, if one is declared
    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Returns whether the primary key is generated by the sequence manager
    pub fn has_auto_increment(&self) -> bool {
        self.fields.iter().any(|f| f.auto_increment)
    }

    pub fn field(&self, column: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Column names in declaration order
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.column.as_str()).collect()
    }

    /// Validates the schema structure itself (not a record).
    ///
    /// Applied to every schema loaded from disk, so a hand-edited artifact
    /// violating the definition rules is reported instead of trusted.
    pub fn validate_structure(&self) -> DbResult<()> {
        if self.name.is_empty() {
            return Err(DbError::InvalidArgument("table name cannot be empty".into()));
        }
        if self.fields.is_empty() {
            return Err(DbError::InvalidArgument(
                "a table must define at least one column".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut primary_key: Option<&str> = None;
        for field in &self.fields {
            if !seen.insert(field.column.as_str()) {
                return Err(DbError::InvalidArgument(format!(
                    "column '{}' is declared twice",
                    field.column
                )));
            }
            if field.primary_key {
                if primary_key.is_some() {
                    return Err(DbError::MultiplePrimaryKeys(field.column.clone()));
                }
                primary_key = Some(&field.column);
            }
            field.check()?;
        }

        Ok(())
    }
}
