//! Journal entry definitions

use std::time::{SystemTime, UNIX_EPOCH};

use crate::account::{Account, AccountPatch};

/// A single queued write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Sequence number - monotonically increasing
    pub seq: u64,

    /// The write to propagate
    pub write: PendingWrite,

    /// Timestamp (unix millis) when the entry was queued
    pub timestamp: u64,
}

impl JournalEntry {
    pub fn new(seq: u64, write: PendingWrite) -> Self {
        Self {
            seq,
            write,
            timestamp: unix_millis(),
        }
    }
}

/// Writes that can be queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    Create(Account),

    Update { username: String, patch: AccountPatch },

    Delete { username: String },

    DeleteAll,
}

impl PendingWrite {
    /// Username the write targets (None for DeleteAll)
    pub fn username(&self) -> Option<&str> {
        match self {
            PendingWrite::Create(account) => Some(&account.username),
            PendingWrite::Update { username, .. } | PendingWrite::Delete { username } => {
                Some(username)
            }
            PendingWrite::DeleteAll => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PendingWrite::Create(_) => "create",
            PendingWrite::Update { .. } => "update",
            PendingWrite::Delete { .. } => "delete",
            PendingWrite::DeleteAll => "delete_all",
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
