//! Journal replay
//!
//! Drains queued writes into a store, oldest first.

use tracing::{debug, warn};

use crate::error::SyncDirError;
use crate::store::AccountStore;

use super::{PendingJournal, PendingWrite};

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    /// Entries that changed the target store
    pub entries_applied: u64,

    /// Entries consumed without a write (already present / already gone)
    pub entries_skipped: u64,

    /// Entries the store rejected for a business reason (not retried)
    pub entries_dropped: u64,

    /// Entries still queued after the replay
    pub entries_remaining: u64,

    /// Whether the store became unavailable mid-replay
    pub interrupted: bool,
}

impl PendingJournal {
    /// Replay queued writes into `store`.
    ///
    /// This will:
    /// 1. Apply entries in sequence order
    /// 2. Consume entries whose effect is already present
    /// 3. Drop entries the store rejects (logged)
    /// 4. Stop at the first `Unavailable`, keeping that entry and the rest
    pub fn replay<S: AccountStore + ?Sized>(&self, store: &S) -> ReplayResult {
        let mut result = ReplayResult::default();

        while let Some(entry) = self.front() {
            let outcome = match &entry.write {
                PendingWrite::Create(account) => store.create(account),
                PendingWrite::Update { username, patch } => store.update(username, patch),
                PendingWrite::Delete { username } => store.delete(username),
                PendingWrite::DeleteAll => store.delete_all().map(|_| ()),
            };

            match outcome {
                Ok(()) => {
                    debug!(seq = entry.seq, kind = entry.write.kind(), "replayed pending write");
                    result.entries_applied += 1;
                }
                Err(SyncDirError::Unavailable(reason)) => {
                    warn!(seq = entry.seq, %reason, "replay interrupted, {} store unavailable", store.name());
                    result.interrupted = true;
                    break;
                }
                Err(SyncDirError::DuplicateKey { field: "username", .. })
                    if matches!(entry.write, PendingWrite::Create(_)) =>
                {
                    result.entries_skipped += 1;
                }
                Err(SyncDirError::NotFound(_)) => {
                    result.entries_skipped += 1;
                }
                Err(err) => {
                    warn!(
                        seq = entry.seq,
                        kind = entry.write.kind(),
                        username = ?entry.write.username(),
                        error = %err,
                        "dropping pending write rejected by {} store",
                        store.name()
                    );
                    result.entries_dropped += 1;
                }
            }

            self.pop_if(entry.seq);
        }

        result.entries_remaining = self.len() as u64;
        result
    }
}
