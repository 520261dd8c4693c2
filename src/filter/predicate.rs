//! Single predicates: `column:operator:literal`
//!
//! The literal is interpreted according to the record's current value for
//! the column:
//! - numeric value: literal parsed as a number
//! - boolean value: `true`/`1` (case-insensitive) is true, anything else false
//! - string value: raw string comparison, quotes stripped
//! - null value or `null`/empty literal: only `==`/`!=` apply, and they
//!   test whether the value is null; ordering operators never match

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::errors::{DbError, DbResult};
use crate::types::{unquote, Record, Value};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }

    /// Applies the operator to the ordering of `actual` relative to the literal.
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

impl FromStr for CompareOp {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            ">=" => Ok(CompareOp::Ge),
            "<=" => Ok(CompareOp::Le),
            other => Err(DbError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A single `column:operator:literal` predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    /// Raw literal, quotes already stripped
    pub literal: String,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: CompareOp, literal: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            literal: literal.into(),
        }
    }

    /// Parses a predicate token.
    ///
    /// The token is split into at most three parts, so literals may
    /// themselves contain `:`.
    pub fn parse(token: &str) -> DbResult<Self> {
        let mut parts = token.splitn(3, ':');
        let (Some(column), Some(op), Some(literal)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DbError::MalformedCondition(format!(
                "'{}' is not of the form column:operator:value",
                token
            )));
        };

        if column.is_empty() {
            return Err(DbError::MalformedCondition(format!(
                "'{}' has no column",
                token
            )));
        }

        Ok(Self::new(column, op.parse()?, unquote(literal)))
    }

    /// Evaluates the predicate against one record.
    ///
    /// A column absent from the record is treated as null.
    pub fn matches(&self, record: &Record) -> DbResult<bool> {
        let actual = record.get(&self.column).unwrap_or(&Value::Null);

        let is_null_literal = self.literal.is_empty() || self.literal.eq_ignore_ascii_case("null");
        if is_null_literal || actual.is_null() {
            let both_null = is_null_literal && actual.is_null();
            return Ok(match self.op {
                CompareOp::Eq => both_null,
                CompareOp::Ne => !both_null,
                _ => false,
            });
        }

        let ordering = match actual {
            Value::Null => return Ok(false),
            Value::Integer(a) => match self.literal.parse::<i64>() {
                Ok(b) => a.cmp(&b),
                Err(_) => compare_f64(*a as f64, self.numeric_literal()?),
            },
            Value::Float(a) => compare_f64(*a, self.numeric_literal()?),
            Value::Boolean(a) => {
                let b = self.literal.eq_ignore_ascii_case("true") || self.literal == "1";
                a.cmp(&b)
            }
            Value::String(a) => a.as_str().cmp(self.literal.as_str()),
        };

        Ok(self.op.holds(ordering))
    }

    fn numeric_literal(&self) -> DbResult<f64> {
        self.literal
            .parse::<f64>()
            .ok()
            .filter(|f| !f.is_nan())
            .ok_or_else(|| DbError::type_mismatch(&self.column, "number", self.literal.as_str()))
    }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    // Stored floats are always finite and literals are never NaN.
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.column, self.op, self.literal)
    }
}
