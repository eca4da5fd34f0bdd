//! Relational store
//!
//! SQLite adapter with an explicit connection state machine:
//!
//! ```text
//!  Disconnected ──connect ok (schema ready)──▶ Connected
//!       ▲                                         │
//!       └──────── connectivity failure ───────────┘
//! ```
//!
//! There is no background reconnection: `connect` is only called when a
//! caller asks for it. Every operation checks the state before dispatch.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::account::{Account, AccountPatch, Role};
use crate::error::{Result, SyncDirError};

use super::AccountStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        role              TEXT NOT NULL DEFAULT 'Customer',
        username          TEXT NOT NULL UNIQUE,
        password          TEXT NOT NULL DEFAULT '',
        email             TEXT NOT NULL DEFAULT '',
        created_date      TEXT NOT NULL,
        original_username TEXT,
        name              TEXT,
        age               INTEGER
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_email
        ON accounts(email) WHERE email <> '';
";

const SELECT_COLUMNS: &str =
    "SELECT role, username, password, email, created_date, original_username, name, age
     FROM accounts";

/// Connection state owned by the adapter
#[derive(Debug)]
pub enum ConnectionState {
    Disconnected,

    /// Connected with the schema in place
    Connected(Connection),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}

/// SQLite-backed account store
///
/// ## Concurrency:
/// - `state`: Mutex, one statement at a time on the single connection
/// - All methods use `&self`
pub struct RelationalStore {
    path: PathBuf,
    connect_timeout: Duration,
    state: Mutex<ConnectionState>,
}

impl RelationalStore {
    /// Create a disconnected adapter for the database at `path`
    pub fn new(path: impl Into<PathBuf>, connect_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            connect_timeout,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    /// Open the database and create the schema, bounded by the connect timeout.
    ///
    /// Already connected is a no-op. A failed or timed-out attempt leaves the
    /// adapter `Disconnected` and returns `Unavailable`.
    pub fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let (tx, rx) = channel::bounded(1);
        let path = self.path.clone();
        let busy_timeout = self.connect_timeout;
        thread::Builder::new()
            .name("syncdir-connect".to_string())
            .spawn(move || {
                // Receiver may be gone after a timeout; the connection is dropped then
                let _ = tx.send(open_connection(&path, busy_timeout));
            })?;

        match rx.recv_timeout(self.connect_timeout) {
            Ok(Ok(conn)) => {
                *self.state.lock() = ConnectionState::Connected(conn);
                info!(path = %self.path.display(), "relational store connected");
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(path = %self.path.display(), error = %err, "relational connect failed");
                Err(SyncDirError::Unavailable(format!(
                    "cannot open {}: {}",
                    self.path.display(),
                    err
                )))
            }
            Err(_) => {
                warn!(path = %self.path.display(), "relational connect timed out");
                Err(SyncDirError::Unavailable(format!(
                    "connect to {} timed out after {:?}",
                    self.path.display(),
                    self.connect_timeout
                )))
            }
        }
    }

    /// Drop the connection (transition to `Disconnected`)
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        if state.is_connected() {
            info!(path = %self.path.display(), "relational store disconnected");
        }
        *state = ConnectionState::Disconnected;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().is_connected()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Username owning `email`, if any
    pub fn owner_of_email(&self, email: &str) -> Result<Option<String>> {
        self.with_conn("owner_of_email", |conn| {
            conn.query_row(
                "SELECT username FROM accounts WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run `f` against the live connection.
    ///
    /// Connectivity-class failures flip the state to `Disconnected` so the
    /// rest of the caller's operation treats the store as absent.
    fn with_conn<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        let outcome = match &*state {
            ConnectionState::Connected(conn) => f(conn),
            ConnectionState::Disconnected => {
                return Err(SyncDirError::Unavailable(format!(
                    "{}: relational store is disconnected",
                    op
                )));
            }
        };

        outcome.map_err(|err| {
            let mapped = classify(err);
            if mapped.is_unavailable() {
                warn!(op, error = %mapped, "relational store lost");
                *state = ConnectionState::Disconnected;
            }
            mapped
        })
    }
}

impl AccountStore for RelationalStore {
    fn name(&self) -> &'static str {
        "relational"
    }

    fn username_exists(&self, username: &str) -> Result<bool> {
        self.with_conn("username_exists", |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1)",
                params![username],
                |row| row.get(0),
            )
        })
    }

    fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn("email_exists", |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
                params![email],
                |row| row.get(0),
            )
        })
    }

    fn create(&self, account: &Account) -> Result<()> {
        self.with_conn("create", |conn| {
            conn.execute(
                "INSERT INTO accounts (
                    role, username, password, email, created_date,
                    original_username, name, age
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    account.role.as_str(),
                    account.username,
                    account.password,
                    account.email,
                    account.created_date_string(),
                    account.original_username,
                    account.name,
                    account.age,
                ],
            )
        })
        .map(|_| debug!(username = %account.username, "relational create"))
        .map_err(|err| with_duplicate_value(err, account))
    }

    fn read(&self, username: &str) -> Result<Option<Account>> {
        self.with_conn("read", |conn| {
            conn.query_row(
                &format!("{} WHERE username = ?1", SELECT_COLUMNS),
                params![username],
                map_account_row,
            )
            .optional()
        })
    }

    fn read_all(&self) -> Result<Vec<Account>> {
        self.with_conn("read_all", |conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY username", SELECT_COLUMNS))?;
            let rows = stmt.query_map([], map_account_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    fn update(&self, username: &str, patch: &AccountPatch) -> Result<()> {
        let updated = self.with_conn("update", |conn| {
            let current = conn
                .query_row(
                    &format!("{} WHERE username = ?1", SELECT_COLUMNS),
                    params![username],
                    map_account_row,
                )
                .optional()?;
            let Some(mut account) = current else {
                return Ok(None);
            };
            account.apply(patch);
            conn.execute(
                "UPDATE accounts
                 SET role = ?1, password = ?2, email = ?3, name = ?4, age = ?5
                 WHERE username = ?6",
                params![
                    account.role.as_str(),
                    account.password,
                    account.email,
                    account.name,
                    account.age,
                    username,
                ],
            )?;
            Ok(Some(account))
        });

        match updated {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(SyncDirError::NotFound(username.to_string())),
            Err(SyncDirError::DuplicateKey { field, .. }) => Err(SyncDirError::DuplicateKey {
                field,
                value: patch.email.clone().unwrap_or_default(),
            }),
            Err(err) => Err(err),
        }
    }

    fn delete(&self, username: &str) -> Result<()> {
        let removed = self.with_conn("delete", |conn| {
            conn.execute("DELETE FROM accounts WHERE username = ?1", params![username])
        })?;
        if removed == 0 {
            return Err(SyncDirError::NotFound(username.to_string()));
        }
        Ok(())
    }

    fn delete_all(&self) -> Result<usize> {
        self.with_conn("delete_all", |conn| conn.execute("DELETE FROM accounts", []))
    }
}

/// Open a connection and make sure the schema exists
fn open_connection(path: &Path, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0))?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let role: Option<String> = row.get(0)?;
    let username: String = row.get(1)?;
    let password: Option<String> = row.get(2)?;
    let email: Option<String> = row.get(3)?;
    let created_date: Option<String> = row.get(4)?;
    let original_username: Option<String> = row.get(5)?;
    let age: Option<i64> = row.get(7)?;

    Ok(Account {
        role: Role::normalize(role.as_deref().unwrap_or_default()),
        password: password.unwrap_or_default(),
        email: email.unwrap_or_default(),
        created_date: Account::parse_created_date(created_date.as_deref().unwrap_or_default()),
        original_username: original_username
            .filter(|original| !original.is_empty())
            .unwrap_or_else(|| username.clone()),
        name: row.get(6)?,
        age: age.and_then(|age| u32::try_from(age).ok()),
        username,
    })
}

/// Map a rusqlite error onto the store taxonomy
fn classify(err: rusqlite::Error) -> SyncDirError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
            ErrorCode::ConstraintViolation => {
                let field = match message.as_deref() {
                    Some(msg) if msg.contains("email") => "email",
                    _ => "username",
                };
                SyncDirError::DuplicateKey {
                    field,
                    value: String::new(),
                }
            }
            ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::DiskFull => SyncDirError::Unavailable(err.to_string()),
            _ => SyncDirError::Storage(err.to_string()),
        },
        _ => SyncDirError::Storage(err.to_string()),
    }
}

/// Fill in the offending value of a duplicate-key failure on insert
fn with_duplicate_value(err: SyncDirError, account: &Account) -> SyncDirError {
    match err {
        SyncDirError::DuplicateKey { field, .. } => SyncDirError::DuplicateKey {
            field,
            value: if field == "email" {
                account.email.clone()
            } else {
                account.username.clone()
            },
        },
        other => other,
    }
}
