//! Tests for the snapshot reader and writer
//!
//! These tests verify:
//! - Both delimiters are accepted
//! - Comments, headers and blank lines are skipped
//! - Malformed lines are skipped without losing valid ones
//! - Rendering is deterministic and re-parses to the same accounts
//! - Delimiters, backslashes and edge whitespace inside fields survive a rewrite
//! - Unchanged content is not rewritten

use std::fs;

use syncdir::account::{Account, Role};
use syncdir::config::Delimiter;
use syncdir::snapshot::{SnapshotReader, SnapshotWriter};
use syncdir::SyncDirError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn account(role: Role, username: &str, date: &str) -> Account {
    Account {
        created_date: Account::parse_created_date(date),
        ..Account::new(username, format!("{}-pw", username), format!("{}@example.com", username), role)
    }
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_load_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();

    let load = SnapshotReader::load(&temp_dir.path().join("accounts.txt")).unwrap();

    assert!(load.accounts.is_empty());
    assert!(load.skipped.is_empty());
}

#[test]
fn test_parse_both_delimiters() {
    let content = "\
Admin | alice | pw1 | alice@example.com | 2024-01-05 09:00:00 | alice
manager, bob, pw2, bob@example.com, 2024-02-01 10:30:00, robert
";
    let load = SnapshotReader::parse(content);

    assert_eq!(load.accounts.len(), 2);
    assert_eq!(load.accounts[0].role, Role::Admin);
    assert_eq!(load.accounts[1].role, Role::Manager);
    assert_eq!(load.accounts[1].password, "pw2");
    assert_eq!(load.accounts[1].original_username, "robert");
    assert_eq!(load.accounts[1].created_date_string(), "2024-02-01 10:30:00");
}

#[test]
fn test_parse_skips_comments_and_headers() {
    let content = "\
# operator note
═══════════════
ACCOUNT LIST
Total Accounts: 1
Last Updated: yesterday
ROLE | USERNAME | PASSWORD | EMAIL | CREATED DATE | ORIGINAL USERNAME
───────────────

Customer | carol | pw | | N/A |
";
    let load = SnapshotReader::parse(content);

    assert!(load.skipped.is_empty());
    assert_eq!(load.accounts.len(), 1);
    let carol = &load.accounts[0];
    assert_eq!(carol.email, "");
    assert_eq!(carol.original_username, "carol");
}

#[test]
fn test_one_malformed_line_among_ten() {
    let mut lines: Vec<String> = (0..10)
        .map(|i| format!("Customer | user{} | pw | user{}@example.com | 2024-01-01 00:00:00 | user{}", i, i, i))
        .collect();
    lines[4] = "Customer | broken | pw".to_string();
    let content = lines.join("\n");

    let load = SnapshotReader::parse(&content);

    assert_eq!(load.accounts.len(), 9);
    assert_eq!(load.skipped.len(), 1);
    assert!(matches!(load.skipped[0], SyncDirError::MalformedInput { line: 5, .. }));
    assert!(load.accounts.iter().all(|account| account.username != "broken"));
}

#[test]
fn test_malformed_variants() {
    let content = "\
no delimiter at all
Admin |  | pw | e | 2024-01-01 00:00:00 | x
Admin | dup | pw | e1 | 2024-01-01 00:00:00 | dup
Admin | dup | other | e2 | 2024-01-01 00:00:00 | dup
";
    let load = SnapshotReader::parse(content);

    assert_eq!(load.accounts.len(), 1);
    assert_eq!(load.accounts[0].password, "pw");
    assert_eq!(load.skipped.len(), 3);
}

#[test]
fn test_unknown_role_becomes_customer() {
    let load = SnapshotReader::parse("Overlord | zed | pw | | 2024-01-01 00:00:00 | zed");
    assert_eq!(load.accounts[0].role, Role::Customer);
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_render_is_sorted_and_deterministic() {
    let accounts = vec![
        account(Role::Customer, "zed", "2024-03-03 03:03:03"),
        account(Role::Admin, "alice", "2024-01-01 01:01:01"),
    ];

    let first = SnapshotWriter::render(&accounts, Delimiter::Pipe);
    let reversed: Vec<Account> = accounts.iter().rev().cloned().collect();
    let second = SnapshotWriter::render(&reversed, Delimiter::Pipe);

    assert_eq!(first, second);
    assert!(first.contains("Total Accounts: 2"));
    let alice_pos = first
        .find("Admin | alice | alice-pw | alice@example.com | 2024-01-01 01:01:01 | alice")
        .unwrap();
    let zed_pos = first.find("Customer | zed |").unwrap();
    assert!(alice_pos < zed_pos);
}

#[test]
fn test_rendered_output_reparses() {
    let accounts = vec![
        account(Role::Manager, "bob", "2024-02-02 02:02:02"),
        account(Role::Admin, "alice", "2024-01-01 01:01:01"),
    ];

    for delimiter in [Delimiter::Pipe, Delimiter::Comma] {
        let load = SnapshotReader::parse(&SnapshotWriter::render(&accounts, delimiter));

        assert!(load.skipped.is_empty(), "{:?}", load.skipped);
        assert_eq!(load.accounts.len(), 2);
        assert_eq!(load.accounts[0], accounts[1]);
        assert_eq!(load.accounts[1], accounts[0]);
    }
}

#[test]
fn test_delimiters_and_edge_whitespace_survive_render() {
    let tricky = [
        ("pipe", "a|b", "p|ipe@example.com"),
        ("comma", "a,b", "c,omma@example.com"),
        ("padded", " pw ", "  padded@example.com "),
        ("slash", "back\\slash\\", "slash@example.com"),
        ("multiline", "line\nbreak", ""),
        ("escapes", "\\s\\|", "tab\t@example.com"),
    ];
    let accounts: Vec<Account> = tricky
        .iter()
        .map(|(username, password, email)| Account {
            created_date: Account::parse_created_date("2024-03-03 03:03:03"),
            ..Account::new(*username, *password, *email, Role::Customer)
        })
        .collect();

    for delimiter in [Delimiter::Pipe, Delimiter::Comma] {
        let rendered = SnapshotWriter::render(&accounts, delimiter);
        let load = SnapshotReader::parse(&rendered);

        assert!(load.skipped.is_empty(), "{:?}", load.skipped);
        assert_eq!(load.accounts.len(), accounts.len());
        for parsed in &load.accounts {
            let original = accounts
                .iter()
                .find(|account| account.username == parsed.username)
                .unwrap();
            assert_eq!(parsed, original);
        }
    }
}

#[test]
fn test_rendered_line_keeps_plain_fields_readable() {
    let accounts = vec![account(Role::Admin, "alice", "2024-01-01 01:01:01")];

    let rendered = SnapshotWriter::render(&accounts, Delimiter::Pipe);

    assert!(rendered.contains(
        "Admin | alice | alice-pw | alice@example.com | 2024-01-01 01:01:01 | alice"
    ));
}

#[test]
fn test_write_only_when_changed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("accounts.txt");
    let accounts = vec![account(Role::Customer, "carol", "2024-05-05 05:05:05")];

    assert!(SnapshotWriter::write(&path, &accounts, Delimiter::Pipe).unwrap());
    assert!(!SnapshotWriter::write(&path, &accounts, Delimiter::Pipe).unwrap());
    assert!(SnapshotWriter::write(&path, &accounts, Delimiter::Comma).unwrap());

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("Customer, carol, carol-pw"));
    assert!(!temp_dir.path().join("accounts.tmp").exists());
}

#[test]
fn test_write_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("accounts.txt");

    SnapshotWriter::write(&path, &[], Delimiter::Pipe).unwrap();

    let load = SnapshotReader::load(&path).unwrap();
    assert!(load.accounts.is_empty());
    assert!(load.skipped.is_empty());
}
