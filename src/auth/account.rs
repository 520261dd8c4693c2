//! Accounts and their persisted list
//!
//! All non-super-user accounts live in one JSON artifact
//! (`users/users.json`). The super-user is implicit: it is never stored,
//! authenticates against the configured root hash, and holds every
//! capability on every database.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::capability::{Capability, CapabilitySet};
use super::crypto::{hash_password, verify_password, PasswordPolicy};
use crate::errors::{DbError, DbResult};
use crate::storage::{read_if_exists, validate_name, write_json_atomic, StorageLayout};

/// Reserved name of the super-user
pub const SUPER_USER: &str = "root";

/// A user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub name: String,

    /// Argon2id PHC string; empty for the implicit super-user
    pub password_hash: String,

    /// Database name -> capabilities held on it
    #[serde(default)]
    pub permissions: BTreeMap<String, CapabilitySet>,

    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Creates an account with no permissions.
    pub fn new(name: &str, password: &str, policy: &PasswordPolicy) -> DbResult<Self> {
        validate_name("user", name)?;
        if name == SUPER_USER {
            return Err(DbError::AlreadyExists(format!("user '{}'", name)));
        }
        policy.validate(password)?;

        Ok(Self {
            name: name.to_string(),
            password_hash: hash_password(password)?,
            permissions: BTreeMap::new(),
            created_at: Utc::now(),
        })
    }

    /// The implicit super-user
    pub fn super_user() -> Self {
        Self {
            name: SUPER_USER.to_string(),
            password_hash: String::new(),
            permissions: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_super_user(&self) -> bool {
        self.name == SUPER_USER
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    /// Capabilities held on `db`; the super-user holds all of them.
    pub fn capabilities(&self, db: &str) -> CapabilitySet {
        if self.is_super_user() {
            return CapabilitySet::all();
        }
        self.permissions.get(db).cloned().unwrap_or_default()
    }

    pub fn has_permission(&self, db: &str, cap: Capability) -> bool {
        self.is_super_user()
            || self
                .permissions
                .get(db)
                .map_or(false, |caps| caps.contains(cap))
    }

    /// Adds `cap` on `db`. Returns false if it was already held.
    pub fn grant(&mut self, db: &str, cap: Capability) -> bool {
        self.permissions.entry(db.to_string()).or_default().insert(cap)
    }

    /// Removes `cap` on `db`, dropping the entry once it is empty.
    /// Returns false if it was not held.
    pub fn revoke(&mut self, db: &str, cap: Capability) -> bool {
        let Some(caps) = self.permissions.get_mut(db) else {
            return false;
        };
        let removed = caps.remove(cap);
        if caps.is_empty() {
            self.permissions.remove(db);
        }
        removed
    }
}

/// Persisted account list
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(layout: &StorageLayout) -> Self {
        Self {
            path: layout.users_path(),
        }
    }

    /// Creates an empty account list if none exists.
    pub fn bootstrap(&self) -> DbResult<()> {
        if !self.path.exists() {
            self.save(&[])?;
        }
        Ok(())
    }

    /// Loads every stored account. A missing artifact is an empty list.
    pub fn load(&self) -> DbResult<Vec<UserAccount>> {
        let Some(content) = read_if_exists(&self.path)? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&content).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "corrupt account list");
            DbError::CorruptData {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })
    }

    pub fn save(&self, accounts: &[UserAccount]) -> DbResult<()> {
        write_json_atomic(&self.path, accounts)?;
        debug!(accounts = accounts.len(), "saved account list");
        Ok(())
    }

    pub fn find(&self, name: &str) -> DbResult<Option<UserAccount>> {
        Ok(self.load()?.into_iter().find(|a| a.name == name))
    }

    /// Stores a new account; fails with `AlreadyExists` on a name clash.
    pub fn insert(&self, account: UserAccount) -> DbResult<()> {
        let mut accounts = self.load()?;
        if account.is_super_user() || accounts.iter().any(|a| a.name == account.name) {
            return Err(DbError::AlreadyExists(format!("user '{}'", account.name)));
        }
        accounts.push(account);
        self.save(&accounts)
    }

    /// Applies `f` to the named account and persists the full list.
    pub fn modify<T>(&self, name: &str, f: impl FnOnce(&mut UserAccount) -> T) -> DbResult<T> {
        let mut accounts = self.load()?;
        let account = accounts
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| DbError::UnknownUser(name.to_string()))?;
        let out = f(account);
        self.save(&accounts)?;
        Ok(out)
    }

    /// Removes every grant on `db` from every account.
    pub fn forget_database(&self, db: &str) -> DbResult<()> {
        let mut accounts = self.load()?;
        let mut changed = false;
        for account in &mut accounts {
            changed |= account.permissions.remove(db).is_some();
        }
        if changed {
            self.save(&accounts)?;
        }
        Ok(())
    }
}
