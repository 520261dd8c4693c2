//! # Errors
//!
//! Error taxonomy shared by every realdb subsystem.
//!
//! Validation failures abort the operation before any artifact is written.
//! Structural read failures distinguish "absent" (not an error, callers see
//! an empty collection) from "corrupt" (always surfaced).

use thiserror::Error;

/// Result type for realdb operations
pub type DbResult<T> = Result<T, DbError>;

/// realdb errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbError {
    // ==================
    // Session Errors
    // ==================
    /// Operation needs an active database
    #[error("No database selected")]
    NoDatabaseSelected,

    /// Empty or otherwise unusable name/argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Database, table or account already registered
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    // ==================
    // Schema Errors
    // ==================
    /// Column type outside {string, integer, float, boolean}
    #[error("Invalid type '{0}' (expected string, integer, float or boolean)")]
    InvalidType(String),

    /// Literal does not validate against the declared column type
    #[error("Type mismatch for column '{column}': '{value}' is not a valid {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        value: String,
    },

    #[error("Only one primary key is allowed per table (second one on '{0}')")]
    MultiplePrimaryKeys(String),

    /// Flag combination that can never be satisfied
    #[error("Invalid constraint on column '{column}': {reason}")]
    InvalidConstraint { column: String, reason: String },

    // ==================
    // Record Errors
    // ==================
    #[error("Duplicate primary key value '{0}'")]
    DuplicateKey(String),

    #[error("Missing value for primary key '{0}'")]
    MissingPrimaryKey(String),

    #[error("Too many values: got {got}, table has {expected} columns")]
    TooManyValues { got: usize, expected: usize },

    // ==================
    // Condition Errors
    // ==================
    #[error("Malformed condition: {0}")]
    MalformedCondition(String),

    #[error("Unsupported operator '{0}'")]
    UnsupportedOperator(String),

    // ==================
    // Artifact Errors
    // ==================
    /// Schema artifact present but unreadable
    #[error("Corrupt schema artifact '{path}': {reason}")]
    CorruptSchema { path: String, reason: String },

    /// Data artifact present but unreadable
    #[error("Corrupt data artifact '{path}': {reason}")]
    CorruptData { path: String, reason: String },

    // ==================
    // Access Errors
    // ==================
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unknown capability '{0}' (expected create, read, delete or update)")]
    UnknownCapability(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Login failure (does not reveal whether the account exists)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Sequence lookup for a table that was never registered
    #[error("Not found: {0}")]
    NotFound(String),

    // ==================
    // Internal Errors
    // ==================
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Returns the stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            DbError::NoDatabaseSelected => "REALDB_NO_DATABASE_SELECTED",
            DbError::InvalidArgument(_) => "REALDB_INVALID_ARGUMENT",
            DbError::AlreadyExists(_) => "REALDB_ALREADY_EXISTS",
            DbError::UnknownDatabase(_) => "REALDB_UNKNOWN_DATABASE",
            DbError::UnknownTable(_) => "REALDB_UNKNOWN_TABLE",
            DbError::UnknownColumn(_) => "REALDB_UNKNOWN_COLUMN",
            DbError::InvalidType(_) => "REALDB_INVALID_TYPE",
            DbError::TypeMismatch { .. } => "REALDB_TYPE_MISMATCH",
            DbError::MultiplePrimaryKeys(_) => "REALDB_MULTIPLE_PRIMARY_KEYS",
            DbError::InvalidConstraint { .. } => "REALDB_INVALID_CONSTRAINT",
            DbError::DuplicateKey(_) => "REALDB_DUPLICATE_KEY",
            DbError::MissingPrimaryKey(_) => "REALDB_MISSING_PRIMARY_KEY",
            DbError::TooManyValues { .. } => "REALDB_TOO_MANY_VALUES",
            DbError::MalformedCondition(_) => "REALDB_MALFORMED_CONDITION",
            DbError::UnsupportedOperator(_) => "REALDB_UNSUPPORTED_OPERATOR",
            DbError::CorruptSchema { .. } => "REALDB_CORRUPT_SCHEMA",
            DbError::CorruptData { .. } => "REALDB_CORRUPT_DATA",
            DbError::PermissionDenied(_) => "REALDB_PERMISSION_DENIED",
            DbError::UnknownCapability(_) => "REALDB_UNKNOWN_CAPABILITY",
            DbError::UnknownUser(_) => "REALDB_UNKNOWN_USER",
            DbError::InvalidCredentials => "REALDB_INVALID_CREDENTIALS",
            DbError::NotFound(_) => "REALDB_NOT_FOUND",
            DbError::Io(_) => "REALDB_IO_ERROR",
            DbError::Config(_) => "REALDB_CONFIG_ERROR",
        }
    }

    pub(crate) fn type_mismatch(
        column: impl Into<String>,
        expected: impl std::fmt::Display,
        value: impl Into<String>,
    ) -> Self {
        DbError::TypeMismatch {
            column: column.into(),
            expected: expected.to_string(),
            value: value.into(),
        }
    }

    pub(crate) fn invalid_constraint(column: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::InvalidConstraint {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Io(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DbError::NoDatabaseSelected.code(), "REALDB_NO_DATABASE_SELECTED");
        assert_eq!(DbError::DuplicateKey("1".into()).code(), "REALDB_DUPLICATE_KEY");
        assert_eq!(
            DbError::CorruptData {
                path: "x".into(),
                reason: "y".into()
            }
            .code(),
            "REALDB_CORRUPT_DATA"
        );
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let msg = DbError::InvalidCredentials.to_string();
        assert!(!msg.contains("password"));
        assert!(!msg.contains("user"));
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = DbError::type_mismatch("age", "integer", "abc");
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("integer"));
        assert!(msg.contains("abc"));
    }
}
