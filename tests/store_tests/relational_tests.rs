//! Tests for RelationalStore
//!
//! These tests verify:
//! - Connection state transitions
//! - Schema creation on connect
//! - Create/read/update/delete against SQLite
//! - Uniqueness constraints surfacing as DuplicateKey
//! - Unavailable when disconnected or unreachable

use std::time::Duration;

use rusqlite::{params, Connection};
use syncdir::account::{Account, AccountPatch, Role};
use syncdir::store::{AccountStore, RelationalStore};
use syncdir::SyncDirError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const TIMEOUT: Duration = Duration::from_secs(3);

fn setup_connected() -> (TempDir, RelationalStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = RelationalStore::new(temp_dir.path().join("accounts.db"), TIMEOUT);
    store.connect().unwrap();
    (temp_dir, store)
}

fn account(username: &str, email: &str) -> Account {
    Account::new(username, "pw", email, Role::Customer)
}

// =============================================================================
// Connection Tests
// =============================================================================

#[test]
fn test_new_store_is_disconnected() {
    let temp_dir = TempDir::new().unwrap();
    let store = RelationalStore::new(temp_dir.path().join("accounts.db"), TIMEOUT);

    assert!(!store.is_connected());
    assert!(store.read_all().unwrap_err().is_unavailable());
}

#[test]
fn test_connect_creates_schema() {
    let (temp_dir, store) = setup_connected();

    assert!(store.is_connected());
    assert!(store.read_all().unwrap().is_empty());

    let conn = Connection::open(temp_dir.path().join("accounts.db")).unwrap();
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'accounts'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn test_connect_is_idempotent() {
    let (_temp, store) = setup_connected();
    store.create(&account("alice", "")).unwrap();

    store.connect().unwrap();

    assert!(store.username_exists("alice").unwrap());
}

#[test]
fn test_connect_unreachable_path() {
    let temp_dir = TempDir::new().unwrap();
    let store = RelationalStore::new(
        temp_dir.path().join("missing").join("accounts.db"),
        TIMEOUT,
    );

    let err = store.connect().unwrap_err();

    assert!(err.is_unavailable());
    assert!(!store.is_connected());
    assert!(store.create(&account("alice", "")).unwrap_err().is_unavailable());
}

#[test]
fn test_disconnect_then_reconnect_keeps_data() {
    let (_temp, store) = setup_connected();
    store.create(&account("alice", "a@example.com")).unwrap();

    store.disconnect();
    assert!(!store.is_connected());
    assert!(store.read("alice").unwrap_err().is_unavailable());

    store.connect().unwrap();
    assert_eq!(store.read("alice").unwrap().unwrap().email, "a@example.com");
}

// =============================================================================
// CRUD Tests
// =============================================================================

#[test]
fn test_create_and_read_round_trip() {
    let (_temp, store) = setup_connected();
    let mut alice = Account::new("alice", "s3cret", "alice@example.com", Role::Admin);
    alice.name = Some("Alice".to_string());
    alice.age = Some(30);

    store.create(&alice).unwrap();

    assert_eq!(store.read("alice").unwrap(), Some(alice));
    assert_eq!(store.read("bob").unwrap(), None);
}

#[test]
fn test_username_is_case_sensitive() {
    let (_temp, store) = setup_connected();
    store.create(&account("alice", "")).unwrap();

    assert!(store.username_exists("alice").unwrap());
    assert!(!store.username_exists("ALICE").unwrap());
}

#[test]
fn test_duplicate_username() {
    let (_temp, store) = setup_connected();
    store.create(&account("alice", "a@example.com")).unwrap();

    let err = store.create(&account("alice", "b@example.com")).unwrap_err();

    assert!(matches!(
        err,
        SyncDirError::DuplicateKey { field: "username", ref value } if value == "alice"
    ));
    assert!(store.is_connected());
}

#[test]
fn test_duplicate_email() {
    let (_temp, store) = setup_connected();
    store.create(&account("alice", "shared@example.com")).unwrap();

    let err = store.create(&account("bob", "shared@example.com")).unwrap_err();

    assert!(matches!(
        err,
        SyncDirError::DuplicateKey { field: "email", ref value } if value == "shared@example.com"
    ));
    assert_eq!(store.owner_of_email("shared@example.com").unwrap(), Some("alice".to_string()));
}

#[test]
fn test_empty_emails_do_not_collide() {
    let (_temp, store) = setup_connected();

    store.create(&account("alice", "")).unwrap();
    store.create(&account("bob", "")).unwrap();

    assert_eq!(store.read_all().unwrap().len(), 2);
}

#[test]
fn test_update_and_email_collision() {
    let (_temp, store) = setup_connected();
    store.create(&account("alice", "a@example.com")).unwrap();
    store.create(&account("bob", "b@example.com")).unwrap();

    store
        .update(
            "bob",
            &AccountPatch {
                role: Some(Role::Manager),
                age: Some(Some(52)),
                ..AccountPatch::default()
            },
        )
        .unwrap();
    let bob = store.read("bob").unwrap().unwrap();
    assert_eq!(bob.role, Role::Manager);
    assert_eq!(bob.age, Some(52));

    let err = store
        .update(
            "bob",
            &AccountPatch {
                email: Some("a@example.com".to_string()),
                ..AccountPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SyncDirError::DuplicateKey { field: "email", .. }));
    assert_eq!(store.read("bob").unwrap().unwrap().email, "b@example.com");
}

#[test]
fn test_update_and_delete_missing() {
    let (_temp, store) = setup_connected();

    assert!(matches!(
        store.update("ghost", &AccountPatch::role(Role::Admin)).unwrap_err(),
        SyncDirError::NotFound(_)
    ));
    assert!(matches!(
        store.delete("ghost").unwrap_err(),
        SyncDirError::NotFound(_)
    ));
}

#[test]
fn test_delete_and_delete_all() {
    let (_temp, store) = setup_connected();
    for name in ["a", "b", "c"] {
        store.create(&account(name, "")).unwrap();
    }

    store.delete("b").unwrap();
    assert!(!store.username_exists("b").unwrap());

    assert_eq!(store.delete_all().unwrap(), 2);
    assert!(store.read_all().unwrap().is_empty());
}

// =============================================================================
// Row Mapping Tests
// =============================================================================

#[test]
fn test_rows_written_by_other_tools_are_normalized() {
    let (temp_dir, store) = setup_connected();

    let conn = Connection::open(temp_dir.path().join("accounts.db")).unwrap();
    conn.execute(
        "INSERT INTO accounts (role, username, password, email, created_date, original_username)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params!["mAnAgEr", "legacy", "pw", "", "not a date", ""],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO accounts (role, username, password, email, created_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params!["superuser", "odd", "pw", "", "2022-02-02 02:02:02"],
    )
    .unwrap();
    drop(conn);

    let legacy = store.read("legacy").unwrap().unwrap();
    assert_eq!(legacy.role, Role::Manager);
    assert_eq!(legacy.original_username, "legacy");

    let odd = store.read("odd").unwrap().unwrap();
    assert_eq!(odd.role, Role::Customer);
    assert_eq!(odd.created_date_string(), "2022-02-02 02:02:02");
}
