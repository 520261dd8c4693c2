//! Operation facade for realdb
//!
//! `Engine` owns the storage handles and serializes every mutation behind
//! one write gate: an in-process mutex plus the data directory lock, so
//! separate processes sharing a data directory also write one at a time. Callers hold a `Session` per logged-in account and pass
//! it to each call.
//!
//! # Access rules
//!
//! - database DDL and account management need the super-user
//! - `createTable`/`insert` need `create` on the active database
//! - `dropTable`/`delete` need `delete`
//! - `select`/`describeTable`/`listTables` need `read`
//! - `useDatabase`/`listDatabases` are open to every account
//!
//! Checks run before any artifact is touched.

mod insert;
mod query;
mod session;

pub use query::{Projection, ResultSet};
pub use session::Session;

use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::auth::{
    verify_password, AccountStore, Capability, PasswordPolicy, UserAccount, SUPER_USER,
};
use crate::config::Config;
use crate::errors::{DbError, DbResult};
use crate::schema::TableSchema;
use crate::sequence::SequenceManager;
use crate::storage::{validate_name, DirLock, RecordStore, StorageLayout};

use insert::prepare_rows;
use query::{compile_conditions, delete_rows, select_rows};

/// Held for the whole of one mutation
struct WriteGate<'a> {
    _dir: DirLock,
    _local: MutexGuard<'a, ()>,
}

/// Entry point to every database operation
#[derive(Debug)]
pub struct Engine {
    config: Config,
    layout: StorageLayout,
    records: RecordStore,
    sequences: SequenceManager,
    accounts: AccountStore,
    write_gate: Mutex<()>,
}

impl Engine {
    /// Opens the data directory, creating the system areas if missing.
    pub fn open(config: Config) -> DbResult<Self> {
        config.validate()?;

        let layout = StorageLayout::new(&config.data_dir);
        fs::create_dir_all(layout.structure_root())?;
        fs::create_dir_all(layout.data_root())?;
        let bootstrap_lock = DirLock::acquire(&layout.lock_path())?;

        let sequences = SequenceManager::new(layout.clone());
        sequences.bootstrap()?;
        let accounts = AccountStore::new(&layout);
        accounts.bootstrap()?;
        drop(bootstrap_lock);

        info!(data_dir = %config.data_dir.display(), "opened engine");

        Ok(Self {
            records: RecordStore::new(layout.clone()),
            sequences,
            accounts,
            layout,
            config,
            write_gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    fn lock(&self) -> DbResult<WriteGate<'_>> {
        // The gate guards no data, so a poisoned lock is still usable.
        let local = self
            .write_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let dir = DirLock::acquire(&self.layout.lock_path())?;
        Ok(WriteGate {
            _dir: dir,
            _local: local,
        })
    }

    fn password_policy(&self) -> PasswordPolicy {
        self.config.password_policy()
    }

    // ==================
    // Sessions
    // ==================

    fn authenticate(&self, name: &str, password: &str) -> DbResult<UserAccount> {
        if name == SUPER_USER {
            return match &self.config.root_password_hash {
                Some(hash) if verify_password(password, hash) => Ok(UserAccount::super_user()),
                _ => Err(DbError::InvalidCredentials),
            };
        }

        match self.accounts.find(name)? {
            Some(account) if account.verify_password(password) => Ok(account),
            _ => Err(DbError::InvalidCredentials),
        }
    }

    /// Opens a session after checking the password.
    pub fn login(&self, name: &str, password: &str) -> DbResult<Session> {
        match self.authenticate(name, password) {
            Ok(account) => {
                info!(user = name, "login");
                Ok(Session::new(account, self.layout.clone()))
            }
            Err(e) => {
                warn!(user = name, "login failed");
                Err(e)
            }
        }
    }

    /// Opens a super-user session without a password.
    pub fn root_session(&self) -> Session {
        Session::new(UserAccount::super_user(), self.layout.clone())
    }

    /// Re-authenticates as another account, keeping the active database.
    pub fn switch_user(&self, session: &mut Session, name: &str, password: &str) -> DbResult<()> {
        let account = self.authenticate(name, password).map_err(|e| {
            warn!(from = %session.account.name, to = name, "switch user failed");
            e
        })?;
        info!(from = %session.account.name, to = name, "switched user");
        session.account = account;
        Ok(())
    }

    /// Reloads the session's account and catalog from disk.
    fn refresh(&self, session: &mut Session) -> DbResult<()> {
        if !session.account.is_super_user() {
            session.account = self
                .accounts
                .find(&session.account.name)?
                .ok_or(DbError::InvalidCredentials)?;
        }
        session.catalog.load()
    }

    /// Refreshes the session and returns the active database if the
    /// account holds `cap` on it.
    fn authorize(&self, session: &mut Session, cap: Capability) -> DbResult<String> {
        self.refresh(session)?;
        session.require(cap)
    }

    // ==================
    // Accounts
    // ==================

    pub fn create_user(&self, session: &mut Session, name: &str, password: &str) -> DbResult<()> {
        session.require_super_user("CREATE USER")?;
        let account = UserAccount::new(name, password, &self.password_policy())?;

        let _gate = self.lock()?;
        self.accounts.insert(account)?;
        info!(user = name, "created user");
        Ok(())
    }

    pub fn grant(
        &self,
        session: &mut Session,
        capability: &str,
        db: &str,
        user: &str,
    ) -> DbResult<()> {
        session.require_super_user("GRANT")?;
        let cap: Capability = capability.parse()?;
        self.check_grant_target(db, user)?;

        let _gate = self.lock()?;
        let added = self.accounts.modify(user, |a| a.grant(db, cap))?;
        info!(user, db, capability = %cap, added, "granted capability");
        Ok(())
    }

    pub fn revoke(
        &self,
        session: &mut Session,
        capability: &str,
        db: &str,
        user: &str,
    ) -> DbResult<()> {
        session.require_super_user("REVOKE")?;
        let cap: Capability = capability.parse()?;
        self.check_grant_target(db, user)?;

        let _gate = self.lock()?;
        let removed = self.accounts.modify(user, |a| a.revoke(db, cap))?;
        info!(user, db, capability = %cap, removed, "revoked capability");
        Ok(())
    }

    fn check_grant_target(&self, db: &str, user: &str) -> DbResult<()> {
        if user == SUPER_USER {
            return Err(DbError::InvalidArgument(
                "the super-user always holds every capability".into(),
            ));
        }
        if validate_name("database", db).is_err() || !self.layout.database_exists(db) {
            return Err(DbError::UnknownDatabase(db.to_string()));
        }
        Ok(())
    }

    // ==================
    // Databases
    // ==================

    pub fn create_database(&self, session: &mut Session, name: &str) -> DbResult<()> {
        session.require_super_user("CREATE DATABASE")?;
        let _gate = self.lock()?;
        self.refresh(session)?;
        session.catalog.create_database(name)
    }

    /// Deletes a database, its sequences and every grant on it.
    pub fn drop_database(&self, session: &mut Session, name: &str) -> DbResult<()> {
        session.require_super_user("DROP DATABASE")?;
        let _gate = self.lock()?;
        self.refresh(session)?;
        session.catalog.drop_database(name, &self.sequences)?;
        self.accounts.forget_database(name)
    }

    /// Selects the active database.
    ///
    /// On failure the previous selection stays active.
    pub fn use_database(&self, session: &mut Session, name: &str) -> DbResult<()> {
        self.refresh(session)?;
        session.catalog.select(name)?;
        debug!(user = %session.account.name, db = name, "database selected");
        Ok(())
    }

    /// Known databases, sorted
    pub fn list_databases(&self, session: &mut Session) -> DbResult<Vec<String>> {
        self.refresh(session)?;
        Ok(session.catalog.databases().to_vec())
    }

    // ==================
    // Tables
    // ==================

    /// Tables of the active database, sorted
    pub fn list_tables(&self, session: &mut Session) -> DbResult<Vec<String>> {
        self.authorize(session, Capability::Read)?;
        session.catalog.table_names()
    }

    pub fn describe_table(&self, session: &mut Session, table: &str) -> DbResult<TableSchema> {
        self.authorize(session, Capability::Read)?;
        session.catalog.table(table).cloned()
    }

    pub fn create_table<S: AsRef<str>>(
        &self,
        session: &mut Session,
        table: &str,
        specs: &[S],
    ) -> DbResult<TableSchema> {
        let _gate = self.lock()?;
        self.authorize(session, Capability::Create)?;
        session
            .catalog
            .create_table(table, specs, &self.records, &self.sequences)
    }

    pub fn drop_table(&self, session: &mut Session, table: &str) -> DbResult<()> {
        let _gate = self.lock()?;
        self.authorize(session, Capability::Delete)?;
        session
            .catalog
            .drop_table(table, &self.records, &self.sequences)
    }

    // ==================
    // Records
    // ==================

    /// Inserts a batch of colon-delimited rows. Returns the row count.
    ///
    /// The batch is validated as a whole, then auto-increment keys are
    /// allocated and the table is rewritten once. A failing row leaves
    /// the table untouched.
    pub fn insert<S: AsRef<str>>(
        &self,
        session: &mut Session,
        table: &str,
        rows: &[S],
    ) -> DbResult<usize> {
        let _gate = self.lock()?;
        let db = self.authorize(session, Capability::Create)?;
        let schema = session.catalog.table(table)?.clone();

        let mut records = self.records.read_all(&db, table)?;
        let mut new_rows = prepare_rows(&schema, rows, &records)?;

        if let Some(pk) = schema.primary_key().filter(|pk| pk.auto_increment) {
            for record in &mut new_rows {
                let id = self.sequences.next(&db, table)?;
                record.insert(pk.column.clone(), id.into());
            }
        }

        let inserted = new_rows.len();
        records.extend(new_rows);
        self.records.write_all(&db, table, &records)?;

        info!(db = %db, table, rows = inserted, "inserted records");
        Ok(inserted)
    }

    /// Returns the projected records matching `conditions`.
    pub fn select<S: AsRef<str>>(
        &self,
        session: &mut Session,
        table: &str,
        conditions: &[S],
        projection: &Projection,
    ) -> DbResult<ResultSet> {
        let db = self.authorize(session, Capability::Read)?;
        let schema = session.catalog.table(table)?;
        let chain = compile_conditions(schema, conditions)?;

        let records = self.records.read_all(&db, table)?;
        let result = select_rows(schema, &records, &chain, projection)?;

        debug!(db = %db, table, rows = result.len(), "selected records");
        Ok(result)
    }

    /// Deletes the records matching `conditions`; an empty chain deletes
    /// everything. Returns the number of records removed.
    pub fn delete<S: AsRef<str>>(
        &self,
        session: &mut Session,
        table: &str,
        conditions: &[S],
    ) -> DbResult<usize> {
        let _gate = self.lock()?;
        let db = self.authorize(session, Capability::Delete)?;
        let schema = session.catalog.table(table)?;
        let chain = compile_conditions(schema, conditions)?;

        let mut records = self.records.read_all(&db, table)?;
        let removed = delete_rows(&mut records, &chain)?;
        if removed > 0 {
            self.records.write_all(&db, table, &records)?;
        }

        info!(db = %db, table, rows = removed, "deleted records");
        Ok(removed)
    }

    /// Next value the sequence of `table` in the active database would
    /// hand out, if it has one.
    pub fn peek_sequence(&self, session: &mut Session, table: &str) -> DbResult<Option<i64>> {
        let db = self.authorize(session, Capability::Read)?;
        session.catalog.table(table)?;
        self.sequences.peek(&db, table)
    }
}
