//! Session context
//!
//! Everything a caller used to keep in ambient state (who is logged in,
//! which database is active) lives here and is passed explicitly to every
//! engine call.

use tracing::warn;

use crate::auth::{Capability, CapabilitySet, UserAccount};
use crate::errors::{DbError, DbResult};
use crate::schema::SchemaCatalog;
use crate::storage::StorageLayout;

/// A logged-in account plus its view of the catalog
#[derive(Debug, Clone)]
pub struct Session {
    pub(super) account: UserAccount,
    pub(super) catalog: SchemaCatalog,
}

impl Session {
    pub(super) fn new(account: UserAccount, layout: StorageLayout) -> Self {
        Self {
            account,
            catalog: SchemaCatalog::new(layout),
        }
    }

    pub fn account(&self) -> &UserAccount {
        &self.account
    }

    pub fn user(&self) -> &str {
        &self.account.name
    }

    pub fn is_super_user(&self) -> bool {
        self.account.is_super_user()
    }

    /// Name of the active database
    pub fn current_database(&self) -> Option<&str> {
        self.catalog.current()
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Capabilities the account holds on `db`
    pub fn capabilities(&self, db: &str) -> CapabilitySet {
        self.account.capabilities(db)
    }

    pub(super) fn require_super_user(&self, action: &str) -> DbResult<()> {
        if self.is_super_user() {
            return Ok(());
        }
        warn!(user = %self.account.name, action, "super-user operation denied");
        Err(DbError::PermissionDenied(format!(
            "{} requires the super-user",
            action
        )))
    }

    /// Returns the active database if the account holds `cap` on it.
    pub(super) fn require(&self, cap: Capability) -> DbResult<String> {
        let db = self.catalog.require_current()?;
        if self.account.has_permission(db, cap) {
            return Ok(db.to_string());
        }
        warn!(user = %self.account.name, db, capability = %cap, "capability denied");
        Err(DbError::PermissionDenied(format!(
            "user '{}' lacks '{}' on database '{}'",
            self.account.name, cap, db
        )))
    }
}
