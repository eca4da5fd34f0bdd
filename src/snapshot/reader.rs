//! Snapshot reader
//!
//! Parses snapshot files into accounts.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::account::{Account, Role};
use crate::error::{Result, SyncDirError};

use super::{escape, COMMENT_PREFIXES, FIELD_COUNT};

/// Outcome of loading a snapshot
#[derive(Debug, Default)]
pub struct SnapshotLoad {
    /// Parsed accounts in file order, unique by username
    pub accounts: Vec<Account>,

    /// One `MalformedInput` per skipped line
    pub skipped: Vec<SyncDirError>,
}

/// Reads snapshot files
pub struct SnapshotReader;

impl SnapshotReader {
    /// Load the snapshot at `path`.
    ///
    /// A missing file is an empty snapshot, not an error.
    pub fn load(path: &Path) -> Result<SnapshotLoad> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let load = Self::parse(&content);
                info!(
                    path = %path.display(),
                    accounts = load.accounts.len(),
                    skipped = load.skipped.len(),
                    "snapshot loaded"
                );
                Ok(load)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snapshot file, starting empty");
                Ok(SnapshotLoad::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parse snapshot content. Never fails: bad lines land in `skipped`.
    pub fn parse(content: &str) -> SnapshotLoad {
        let mut load = SnapshotLoad::default();
        let mut seen = HashSet::new();

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            match Self::parse_line(line, line_no) {
                Ok(Some(account)) => {
                    if seen.insert(account.username.clone()) {
                        load.accounts.push(account);
                    } else {
                        let err = SyncDirError::MalformedInput {
                            line: line_no,
                            reason: format!("duplicate username '{}'", account.username),
                        };
                        warn!(%err, "skipping snapshot line");
                        load.skipped.push(err);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(%err, "skipping snapshot line");
                    load.skipped.push(err);
                }
            }
        }

        load
    }

    /// Parse one line.
    ///
    /// Returns `Ok(None)` for blank and comment lines and `MalformedInput`
    /// for lines that look like data but cannot be read.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Account>> {
        let line = line.trim();
        if line.is_empty() || Self::is_comment(line) {
            return Ok(None);
        }

        let delimiter = match escape::detect_delimiter(line) {
            Some(delimiter) => delimiter,
            None => return Err(malformed(line_no, "no field delimiter")),
        };

        let parts: Vec<String> = escape::split_unescaped(line, delimiter)
            .into_iter()
            .map(|raw| escape::unescape_field(raw.trim()))
            .collect();
        if parts.len() < FIELD_COUNT {
            return Err(malformed(
                line_no,
                &format!("expected {} fields, found {}", FIELD_COUNT, parts.len()),
            ));
        }

        let username = parts[1].as_str();
        if username.is_empty() {
            return Err(malformed(line_no, "empty username"));
        }

        let role = Role::normalize(&parts[0]);
        if !parts[0].is_empty() && !parts[0].eq_ignore_ascii_case(role.as_str()) {
            debug!(line = line_no, raw = %parts[0], "unrecognized role, using Customer");
        }

        let original_username = if parts[5].is_empty() { username } else { parts[5].as_str() };

        Ok(Some(Account {
            role,
            username: username.to_string(),
            password: parts[2].clone(),
            email: parts[3].clone(),
            created_date: Account::parse_created_date(&parts[4]),
            original_username: original_username.to_string(),
            name: None,
            age: None,
        }))
    }

    /// Whether a (trimmed) line is a comment or header
    pub fn is_comment(line: &str) -> bool {
        COMMENT_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
    }
}

fn malformed(line: usize, reason: &str) -> SyncDirError {
    SyncDirError::MalformedInput {
        line,
        reason: reason.to_string(),
    }
}
