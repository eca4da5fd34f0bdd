//! Snapshot Module
//!
//! Human-editable flat file listing every account; a third, possibly stale,
//! source of truth.
//!
//! ## Responsibilities
//! - Parse lines into accounts, skipping comments and malformed lines
//! - Render the merged view deterministically (sorted by username)
//! - Rewrite the file only when its content actually changes
//!
//! ## File Format
//! ```text
//! ════════════════════════════════════════════ (header, skipped on read)
//! ACCOUNT LIST
//! Total Accounts: 2
//! ════════════════════════════════════════════
//! ROLE | USERNAME | PASSWORD | EMAIL | CREATED DATE | ORIGINAL USERNAME
//! ────────────────────────────────────────────
//! Admin | alice | s3cret | alice@example.com | 2024-01-05 09:00:00 | alice
//! Customer, bob, hunter2, bob@example.com, N/A, bob      (comma also accepted)
//! ```
//!
//! `name` and `age` are not part of the format.
//!
//! Fields are backslash-escaped (see `escape`): `\|` `\,` `\\` `\n` `\r`
//! anywhere, `\s` `\t` for whitespace at either end of a field.

mod escape;
mod reader;
mod writer;

pub use reader::{SnapshotLoad, SnapshotReader};
pub use writer::SnapshotWriter;

/// Number of fields on an account line
pub const FIELD_COUNT: usize = 6;

/// Lines starting with any of these are comments or headers
pub const COMMENT_PREFIXES: &[&str] = &[
    "#",
    "═",
    "─",
    "ACCOUNT LIST",
    "ROLE",
    "Example:",
    "Total Accounts",
    "Last Updated",
    "This file is automatically",
    "PURPOSE:",
    "FILE FORMAT:",
    "ALTERNATIVE FORMAT:",
    "IMPORTANT NOTES:",
    "ACCOUNT DATA:",
    "AUTOMATIC UPDATES:",
];
