//! Snapshot writer
//!
//! Renders the merged account view and writes it back to disk.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::account::Account;
use crate::config::Delimiter;
use crate::error::Result;

use super::escape;

const RULE_HEAVY: &str = "════════════════════════════════════════════════════════════";
const RULE_LIGHT: &str = "────────────────────────────────────────────────────────────";
const COLUMNS: [&str; 6] = [
    "ROLE",
    "USERNAME",
    "PASSWORD",
    "EMAIL",
    "CREATED DATE",
    "ORIGINAL USERNAME",
];

/// Writes snapshot files
pub struct SnapshotWriter;

impl SnapshotWriter {
    /// Render accounts into snapshot text.
    ///
    /// Output depends only on the accounts and delimiter (no timestamps),
    /// so rendering an unchanged view reproduces the same bytes. Every
    /// field is escaped and parses back to the same value.
    pub fn render(accounts: &[Account], delimiter: Delimiter) -> String {
        let mut sorted: Vec<&Account> = accounts.iter().collect();
        sorted.sort_by(|a, b| a.username.cmp(&b.username));

        let separator = delimiter.separator();
        let mut out = String::new();

        out.push_str(RULE_HEAVY);
        out.push('\n');
        out.push_str("ACCOUNT LIST\n");
        out.push_str(
            "This file is automatically rewritten by syncdir. \
             Edits to role, password and email are imported on the next reconciliation.\n",
        );
        out.push_str(&format!("FILE FORMAT: {}\n", COLUMNS.join(" | ")));
        out.push_str(&format!("ALTERNATIVE FORMAT: {}\n", COLUMNS.join(", ")));
        out.push_str(&format!("Total Accounts: {}\n", sorted.len()));
        out.push_str(RULE_HEAVY);
        out.push('\n');
        out.push_str(&COLUMNS.join(separator));
        out.push('\n');
        out.push_str(RULE_LIGHT);
        out.push('\n');

        for account in sorted {
            let created = account.created_date_string();
            let fields = [
                account.role.as_str(),
                account.username.as_str(),
                account.password.as_str(),
                account.email.as_str(),
                created.as_str(),
                account.original_username.as_str(),
            ];
            let escaped: Vec<_> = fields.iter().map(|field| escape::escape_field(field)).collect();
            out.push_str(&escaped.join(separator));
            out.push('\n');
        }

        out
    }

    /// Write the snapshot if its content changed.
    ///
    /// Returns `Ok(true)` when the file was (re)written. The new content
    /// goes to a sibling temp file first and is renamed into place.
    pub fn write(path: &Path, accounts: &[Account], delimiter: Delimiter) -> Result<bool> {
        let rendered = Self::render(accounts, delimiter);

        if let Ok(existing) = fs::read_to_string(path) {
            if existing == rendered {
                debug!(path = %path.display(), "snapshot unchanged");
                return Ok(false);
            }
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, &rendered)?;
        fs::rename(&tmp_path, path)?;

        info!(path = %path.display(), accounts = accounts.len(), "snapshot written");
        Ok(true)
    }
}
