//! Access Control Tests
//!
//! - The super-user bypasses every capability check
//! - Other accounts need the capability on the active database
//! - Denied operations leave no trace on disk
//! - Grants and revokes are persisted and idempotent

use realdb::auth::{hash_password, Capability, CapabilitySet};
use realdb::{Config, DbError, Engine, Projection, Session};
use tempfile::TempDir;

const ALL: [&str; 0] = [];

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, Engine, Session) {
    let tmp = TempDir::new().unwrap();
    let config = Config::for_data_dir(tmp.path().join("data"))
        .with_root_password_hash(hash_password("rootpassword").unwrap());
    let engine = Engine::open(config).unwrap();

    let mut root = engine.root_session();
    engine.create_database(&mut root, "shop").unwrap();
    engine.use_database(&mut root, "shop").unwrap();
    engine
        .create_table(&mut root, "items", &["id:integer:pk", "label:string"])
        .unwrap();
    engine.insert(&mut root, "items", &["1:pen"]).unwrap();
    engine.create_user(&mut root, "alice", "alicepass").unwrap();

    (tmp, engine, root)
}

fn alice(engine: &Engine) -> Session {
    let mut s = engine.login("alice", "alicepass").unwrap();
    engine.use_database(&mut s, "shop").unwrap();
    s
}

fn assert_denied<T: std::fmt::Debug>(result: Result<T, DbError>) {
    assert!(
        matches!(result, Err(DbError::PermissionDenied(_))),
        "expected PermissionDenied, got {:?}",
        result
    );
}

// =============================================================================
// Login Tests
// =============================================================================

#[test]
fn test_login() {
    let (_tmp, engine, _root) = setup();

    assert!(engine.login("root", "rootpassword").unwrap().is_super_user());
    assert_eq!(engine.login("alice", "alicepass").unwrap().user(), "alice");

    for (user, password) in [("alice", "wrong"), ("nobody", "alicepass"), ("root", "alicepass")] {
        assert_eq!(
            engine.login(user, password).unwrap_err(),
            DbError::InvalidCredentials
        );
    }
}

#[test]
fn test_accounts_survive_reopen() {
    let (tmp, engine, _root) = setup();
    let config = engine.config().clone();
    drop(engine);

    let engine = Engine::open(config).unwrap();
    assert!(engine.login("alice", "alicepass").is_ok());
    drop(tmp);
}

#[test]
fn test_create_user_rules() {
    let (_tmp, engine, mut root) = setup();

    assert!(matches!(
        engine.create_user(&mut root, "alice", "otherpass"),
        Err(DbError::AlreadyExists(_))
    ));
    assert!(matches!(
        engine.create_user(&mut root, "root", "otherpass"),
        Err(DbError::AlreadyExists(_))
    ));
    assert!(matches!(
        engine.create_user(&mut root, "bob", "short"),
        Err(DbError::InvalidArgument(_))
    ));

    let mut a = alice(&engine);
    assert_denied(engine.create_user(&mut a, "mallory", "mallorypass"));
}

// =============================================================================
// Capability Tests
// =============================================================================

/// Without `create`, createTable and insert fail before touching disk.
#[test]
fn test_create_capability_required() {
    let (tmp, engine, mut root) = setup();
    let mut a = alice(&engine);

    assert_denied(engine.create_table(&mut a, "orders", &["id:integer:pk"]));
    assert!(!tmp.path().join("data/structure/shop/orders_schema.json").exists());
    assert!(!tmp.path().join("data/data/shop/orders_data.json").exists());

    let before = std::fs::read_to_string(tmp.path().join("data/data/shop/items_data.json")).unwrap();
    assert_denied(engine.insert(&mut a, "items", &["2:cup"]));
    let after = std::fs::read_to_string(tmp.path().join("data/data/shop/items_data.json")).unwrap();
    assert_eq!(before, after);

    engine.grant(&mut root, "create", "shop", "alice").unwrap();
    engine.create_table(&mut a, "orders", &["id:integer:pk"]).unwrap();
    assert_eq!(engine.insert(&mut a, "items", &["2:cup"]).unwrap(), 1);
}

#[test]
fn test_read_capability_required() {
    let (_tmp, engine, mut root) = setup();
    let mut a = alice(&engine);

    assert_denied(engine.select(&mut a, "items", &ALL, &Projection::All));
    assert_denied(engine.describe_table(&mut a, "items"));
    assert_denied(engine.list_tables(&mut a));

    engine.grant(&mut root, "r", "shop", "alice").unwrap();
    assert_eq!(
        engine.select(&mut a, "items", &ALL, &Projection::All).unwrap().len(),
        1
    );
    assert_eq!(engine.list_tables(&mut a).unwrap(), vec!["items"]);
}

#[test]
fn test_delete_capability_required() {
    let (_tmp, engine, mut root) = setup();
    let mut a = alice(&engine);

    assert_denied(engine.delete(&mut a, "items", &ALL));
    assert_denied(engine.drop_table(&mut a, "items"));

    engine.grant(&mut root, "DELETE", "shop", "alice").unwrap();
    assert_eq!(engine.delete(&mut a, "items", &ALL).unwrap(), 1);
    engine.drop_table(&mut a, "items").unwrap();
}

/// Capabilities are scoped to one database.
#[test]
fn test_capabilities_are_per_database() {
    let (_tmp, engine, mut root) = setup();
    engine.create_database(&mut root, "lab").unwrap();
    engine.grant(&mut root, "read", "lab", "alice").unwrap();

    let mut a = alice(&engine);
    assert_denied(engine.list_tables(&mut a));
    engine.use_database(&mut a, "lab").unwrap();
    assert!(engine.list_tables(&mut a).unwrap().is_empty());
}

#[test]
fn test_database_ddl_is_super_user_only() {
    let (_tmp, engine, _root) = setup();
    let mut a = alice(&engine);

    assert_denied(engine.create_database(&mut a, "mine"));
    assert_denied(engine.drop_database(&mut a, "shop"));
    assert_denied(engine.grant(&mut a, "read", "shop", "alice"));
    assert_denied(engine.revoke(&mut a, "read", "shop", "alice"));
}

/// Any account may list and select databases.
#[test]
fn test_use_and_list_open_to_all() {
    let (_tmp, engine, _root) = setup();
    let mut a = engine.login("alice", "alicepass").unwrap();
    assert_eq!(engine.list_databases(&mut a).unwrap(), vec!["shop"]);
    engine.use_database(&mut a, "shop").unwrap();
    assert_eq!(a.current_database(), Some("shop"));
}

// =============================================================================
// Grant / Revoke Tests
// =============================================================================

#[test]
fn test_grant_and_revoke_are_idempotent() {
    let (_tmp, engine, mut root) = setup();

    engine.grant(&mut root, "read", "shop", "alice").unwrap();
    engine.grant(&mut root, "read", "shop", "alice").unwrap();
    engine.grant(&mut root, "c", "shop", "alice").unwrap();
    let a = alice(&engine);
    assert_eq!(a.capabilities("shop").to_string(), "cr");

    engine.revoke(&mut root, "read", "shop", "alice").unwrap();
    engine.revoke(&mut root, "read", "shop", "alice").unwrap();
    engine.revoke(&mut root, "create", "shop", "alice").unwrap();
    let a = alice(&engine);
    assert_eq!(a.capabilities("shop"), CapabilitySet::new());
    assert!(!a.account().permissions.contains_key("shop"));
}

#[test]
fn test_grant_errors() {
    let (_tmp, engine, mut root) = setup();

    assert_eq!(
        engine.grant(&mut root, "drop", "shop", "alice").unwrap_err(),
        DbError::UnknownCapability("drop".into())
    );
    assert_eq!(
        engine.grant(&mut root, "read", "nowhere", "alice").unwrap_err(),
        DbError::UnknownDatabase("nowhere".into())
    );
    assert_eq!(
        engine.grant(&mut root, "read", "shop", "ghost").unwrap_err(),
        DbError::UnknownUser("ghost".into())
    );
    assert!(matches!(
        engine.grant(&mut root, "read", "shop", "root"),
        Err(DbError::InvalidArgument(_))
    ));
}

/// The update capability can be held even though nothing consumes it.
#[test]
fn test_update_capability_grantable() {
    let (_tmp, engine, mut root) = setup();
    engine.grant(&mut root, "u", "shop", "alice").unwrap();
    let a = alice(&engine);
    assert!(a.account().has_permission("shop", Capability::Update));
    assert!(!a.account().has_permission("shop", Capability::Read));
}

/// Dropping a database clears every grant on it.
#[test]
fn test_drop_database_forgets_grants() {
    let (_tmp, engine, mut root) = setup();
    engine.grant(&mut root, "read", "shop", "alice").unwrap();
    engine.drop_database(&mut root, "shop").unwrap();
    engine.create_database(&mut root, "shop").unwrap();

    let mut a = alice(&engine);
    assert_denied(engine.list_tables(&mut a));
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_root_session_holds_everything() {
    let (_tmp, engine, root) = setup();
    assert!(root.is_super_user());
    assert_eq!(root.capabilities("anything"), CapabilitySet::all());
    drop(engine);
}

/// SU swaps the account but keeps the selected database.
#[test]
fn test_switch_user_keeps_database() {
    let (_tmp, engine, mut root) = setup();
    engine.switch_user(&mut root, "alice", "alicepass").unwrap();
    assert_eq!(root.user(), "alice");
    assert_eq!(root.current_database(), Some("shop"));
    assert_denied(engine.list_tables(&mut root));

    assert_eq!(
        engine.switch_user(&mut root, "root", "nope").unwrap_err(),
        DbError::InvalidCredentials
    );
    assert_eq!(root.user(), "alice");
}
