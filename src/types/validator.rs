//! Type validator
//!
//! Pure predicates deciding whether a value is acceptable for a declared
//! column type, plus the conversion of accepted literals into typed values.
//!
//! Coercion rules:
//! - string: anything non-null
//! - integer: native integers, or strings fully parseable as base-10 integers
//! - float: native integers/floats, or strings parseable as finite decimals
//! - boolean: native booleans, or `true`/`false`/`1`/`0` (case-insensitive)

use super::value::{ColumnType, Value};

/// Returns whether `value` is acceptable for a column of type `ty`.
///
/// Never fails: malformed input is simply rejected.
pub fn validate(value: &Value, ty: ColumnType) -> bool {
    match (ty, value) {
        (_, Value::Null) => false,
        (ColumnType::String, _) => true,
        (ColumnType::Integer, Value::Integer(_)) => true,
        (ColumnType::Integer, Value::String(s)) => s.parse::<i64>().is_ok(),
        (ColumnType::Float, Value::Integer(_) | Value::Float(_)) => true,
        (ColumnType::Float, Value::String(s)) => parse_float(s).is_some(),
        (ColumnType::Boolean, Value::Boolean(_)) => true,
        (ColumnType::Boolean, Value::String(s)) => parse_bool(s).is_some(),
        _ => false,
    }
}

/// Validates a raw client literal (quotes stripped) against `ty`.
pub fn validate_literal(literal: &str, ty: ColumnType) -> bool {
    validate(&Value::String(unquote(literal).to_string()), ty)
}

/// Converts a raw client literal into a typed value.
///
/// Returns `None` if the literal does not validate against `ty`.
pub fn coerce(literal: &str, ty: ColumnType) -> Option<Value> {
    let literal = unquote(literal);
    match ty {
        ColumnType::String => Some(Value::String(literal.to_string())),
        ColumnType::Integer => literal.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Float => parse_float(literal).map(Value::Float),
        ColumnType::Boolean => parse_bool(literal).map(Value::Boolean),
    }
}

/// Parses a finite decimal number.
///
/// Non-finite values are rejected since they cannot be stored as JSON.
pub fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Parses the boolean literals `true`/`false`/`1`/`0`, case-insensitively.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Strips one pair of surrounding single or double quotes.
pub fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_literals() {
        assert!(validate_literal("42", ColumnType::Integer));
        assert!(validate_literal("-3", ColumnType::Integer));
        assert!(!validate_literal("4.2", ColumnType::Integer));
        assert!(!validate_literal("abc", ColumnType::Integer));
        assert!(!validate_literal("", ColumnType::Integer));
    }

    #[test]
    fn test_native_values() {
        assert!(validate(&Value::Integer(7), ColumnType::Integer));
        assert!(validate(&Value::Integer(7), ColumnType::Float));
        assert!(validate(&Value::Float(7.5), ColumnType::Float));
        assert!(!validate(&Value::Float(7.5), ColumnType::Integer));
        assert!(validate(&Value::Boolean(false), ColumnType::Boolean));
        assert!(!validate(&Value::Boolean(true), ColumnType::Integer));
        assert!(validate(&Value::Integer(1), ColumnType::String));
    }

    #[test]
    fn test_null_is_never_valid() {
        for ty in [
            ColumnType::String,
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Boolean,
        ] {
            assert!(!validate(&Value::Null, ty));
        }
    }

    #[test]
    fn test_float_literals() {
        assert!(validate_literal("3.14", ColumnType::Float));
        assert!(validate_literal("10", ColumnType::Float));
        assert!(validate_literal("-0.5e3", ColumnType::Float));
        assert!(!validate_literal("1,5", ColumnType::Float));
        assert!(!validate_literal("inf", ColumnType::Float));
        assert!(!validate_literal("NaN", ColumnType::Float));
    }

    #[test]
    fn test_boolean_literals() {
        for lit in ["true", "FALSE", "True", "1", "0"] {
            assert!(validate_literal(lit, ColumnType::Boolean), "{}", lit);
        }
        for lit in ["yes", "2", "", "t"] {
            assert!(!validate_literal(lit, ColumnType::Boolean), "{}", lit);
        }
    }

    #[test]
    fn test_coerce_produces_typed_values() {
        assert_eq!(coerce("42", ColumnType::Integer), Some(Value::Integer(42)));
        assert_eq!(coerce("2.5", ColumnType::Float), Some(Value::Float(2.5)));
        assert_eq!(coerce("1", ColumnType::Boolean), Some(Value::Boolean(true)));
        assert_eq!(
            coerce("'bob'", ColumnType::String),
            Some(Value::String("bob".into()))
        );
        assert_eq!(coerce("x", ColumnType::Integer), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a b\""), "a b");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("'mixed\""), "'mixed\"");
    }
}
