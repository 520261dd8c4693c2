//! Select and delete over condition chains

use std::collections::BTreeSet;

use serde::Serialize;

use crate::errors::{DbError, DbResult};
use crate::filter::ConditionChain;
use crate::schema::TableSchema;
use crate::types::{Record, Value};

/// Column projection of a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every declared column, in declaration order
    All,
    Columns(Vec<String>),
}

impl Projection {
    /// Parses `*` or a comma-separated column list.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s == "*" {
            return Projection::All;
        }
        Projection::Columns(
            s.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    fn resolve(&self, schema: &TableSchema) -> DbResult<Vec<String>> {
        match self {
            Projection::All => Ok(schema.fields.iter().map(|f| f.column.clone()).collect()),
            Projection::Columns(columns) if columns.is_empty() => Err(DbError::InvalidArgument(
                "projection names no columns".into(),
            )),
            Projection::Columns(columns) => {
                for column in columns {
                    if schema.field(column).is_none() {
                        return Err(DbError::UnknownColumn(column.clone()));
                    }
                }
                Ok(columns.clone())
            }
        }
    }
}

/// Rows returned by a select
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parses a condition chain and checks it against the schema's columns.
pub(crate) fn compile_conditions<S: AsRef<str>>(
    schema: &TableSchema,
    conditions: &[S],
) -> DbResult<ConditionChain> {
    let chain = ConditionChain::parse(conditions)?;
    chain.validate_columns(&schema.columns())?;
    Ok(chain)
}

pub(crate) fn select_rows(
    schema: &TableSchema,
    records: &[Record],
    chain: &ConditionChain,
    projection: &Projection,
) -> DbResult<ResultSet> {
    let columns = projection.resolve(schema)?;
    let rows = chain
        .filter(records)?
        .into_iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(ResultSet { columns, rows })
}

/// Removes every matching record, each at most once.
///
/// Returns the number of records removed.
pub(crate) fn delete_rows(records: &mut Vec<Record>, chain: &ConditionChain) -> DbResult<usize> {
    let doomed: BTreeSet<usize> = chain.evaluate(records)?.into_iter().collect();
    let mut position = 0;
    records.retain(|_| {
        let keep = !doomed.contains(&position);
        position += 1;
        keep
    });
    Ok(doomed.len())
}
