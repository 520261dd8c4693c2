//! Configuration file
//!
//! A single JSON object:
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/realdb",
//!   "root_password_hash": "$argon2id$...",
//!   "log_filter": "info",
//!   "min_password_length": 8
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::{is_valid_hash, PasswordPolicy};
use crate::errors::{DbError, DbResult};
use crate::storage::write_json_atomic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of all persisted artifacts (required)
    pub data_dir: PathBuf,

    /// Argon2 PHC hash of the super-user password. Without it the
    /// super-user cannot log in with a password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_password_hash: Option<String>,

    /// `tracing` filter directive (default "info")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Minimum length of new account passwords (default 8)
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_min_password_length() -> usize {
    8
}

impl Config {
    /// Configuration with defaults for the given data directory
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            root_password_hash: None,
            log_filter: default_log_filter(),
            min_password_length: default_min_password_length(),
        }
    }

    pub fn with_root_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.root_password_hash = Some(hash.into());
        self
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DbError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| DbError::Config(format!("invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(DbError::Config("data_dir must not be empty".into()));
        }

        if let Some(hash) = &self.root_password_hash {
            if !is_valid_hash(hash) {
                return Err(DbError::Config(
                    "root_password_hash is not a valid Argon2 hash".into(),
                ));
            }
        }

        if self.log_filter.trim().is_empty() {
            return Err(DbError::Config("log_filter must not be empty".into()));
        }

        Ok(())
    }

    /// Writes the configuration atomically.
    pub fn save(&self, path: &Path) -> DbResult<()> {
        self.validate()?;
        write_json_atomic(path, self)
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::new(self.min_password_length)
    }
}
