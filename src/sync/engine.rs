//! Sync engine
//!
//! Runs reconciliation passes across the three sources.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::account::Account;
use crate::config::{Config, DeletedAccountPolicy, Delimiter, DivergencePolicy};
use crate::error::{Result, SyncDirError};
use crate::journal::{PendingJournal, ReplayResult};
use crate::snapshot::{SnapshotReader, SnapshotWriter};
use crate::store::{AccountStore, FallbackStore, RelationalStore};

use super::merge::{merge, StoreAction};

/// How much of the snapshot a pass takes into account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope<'a> {
    /// Every snapshot line
    Full,

    /// Every line except this username (it was just written through the
    /// directory, so the file's copy is stale)
    Except(&'a str),

    /// Ignore the snapshot for this pass
    Skip,
}

/// What a reconciliation pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Relational store usable for the whole pass
    pub relational_reachable: bool,

    /// Pending-write replay stats
    pub journal: ReplayResult,

    /// Accounts read from the snapshot (after scope/suppression filters)
    pub snapshot_accounts: usize,

    /// Malformed snapshot lines skipped
    pub snapshot_skipped: usize,

    pub fallback_created: usize,
    pub fallback_updated: usize,
    pub relational_created: usize,
    pub relational_updated: usize,

    /// Effects a store rejected
    pub failures: usize,

    /// Snapshot file rewritten at the end of the pass
    pub snapshot_written: bool,
}

impl ReconcileReport {
    /// Successful store writes made by the pass
    pub fn writes(&self) -> usize {
        self.journal.entries_applied as usize
            + self.fallback_created
            + self.fallback_updated
            + self.relational_created
            + self.relational_updated
    }
}

/// Outcome of applying one effect
#[derive(Debug)]
enum Applied {
    Nothing,
    Created,
    Updated,
}

/// Orchestrates reconciliation between the relational store, the fallback
/// store and the snapshot.
///
/// ## Pass Order
/// 1. Replay pending writes into the relational store (if connected)
/// 2. Load the snapshot (scoped, minus suppressed deletions)
/// 3. Merge every username found in any source
/// 4. Apply effects: fallback first, then relational while reachable
/// 5. Rewrite the snapshot from the merged view if it changed
///
/// The engine holds no store; callers pass them in and serialize passes.
pub struct SyncEngine {
    snapshot_path: PathBuf,
    delimiter: Delimiter,
    divergence: DivergencePolicy,
    deleted_policy: DeletedAccountPolicy,

    /// Writes the relational store has not seen yet
    journal: PendingJournal,

    /// Usernames deleted through the directory (Suppress policy only)
    deleted: Mutex<BTreeSet<String>>,
}

impl SyncEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            snapshot_path: config.snapshot_path.clone(),
            delimiter: config.snapshot_delimiter,
            divergence: config.divergence_policy,
            deleted_policy: config.deleted_account_policy,
            journal: PendingJournal::new(),
            deleted: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn journal(&self) -> &PendingJournal {
        &self.journal
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Remember a deletion so the snapshot cannot resurrect it
    pub fn record_deletion(&self, username: &str) {
        if self.deleted_policy == DeletedAccountPolicy::Suppress {
            self.deleted.lock().insert(username.to_string());
        }
    }

    /// Forget a deletion (the username was registered again)
    pub fn forget_deletion(&self, username: &str) {
        self.deleted.lock().remove(username);
    }

    pub fn is_suppressed(&self, username: &str) -> bool {
        self.deleted.lock().contains(username)
    }

    /// Run one reconciliation pass
    pub fn reconcile(
        &self,
        relational: &RelationalStore,
        fallback: &FallbackStore,
        scope: SnapshotScope<'_>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            relational_reachable: relational.is_connected(),
            ..ReconcileReport::default()
        };

        // Step 1: Replay writes made while the relational store was away
        if report.relational_reachable && !self.journal.is_empty() {
            report.journal = self.journal.replay(relational);
            if report.journal.interrupted {
                report.relational_reachable = false;
            }
        }

        // Step 2: Snapshot
        let snapshot = self.load_snapshot(scope, &mut report);

        // Step 3: Live stores
        let relational_accounts = if report.relational_reachable {
            match relational.read_all() {
                Ok(accounts) => index_by_username(accounts),
                Err(err) => {
                    warn!(error = %err, "relational read failed, skipping it this pass");
                    report.relational_reachable = false;
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        let fallback_accounts = index_by_username(fallback.read_all().unwrap_or_default());

        let usernames: BTreeSet<&String> = relational_accounts
            .keys()
            .chain(fallback_accounts.keys())
            .chain(snapshot.keys())
            .collect();

        // Step 4: Merge and apply
        for username in usernames {
            let Some(merged) = merge(
                relational_accounts.get(username),
                fallback_accounts.get(username),
                snapshot.get(username),
                self.divergence,
            ) else {
                continue;
            };

            match apply(fallback, username, &merged.fallback) {
                Ok(Applied::Created) => report.fallback_created += 1,
                Ok(Applied::Updated) => report.fallback_updated += 1,
                Ok(Applied::Nothing) => {}
                Err(err) => {
                    warn!(%username, error = %err, "fallback rejected sync effect");
                    report.failures += 1;
                }
            }

            if !report.relational_reachable {
                continue;
            }
            match apply(relational, username, &merged.relational) {
                Ok(Applied::Created) => report.relational_created += 1,
                Ok(Applied::Updated) => report.relational_updated += 1,
                Ok(Applied::Nothing) => {}
                Err(SyncDirError::Unavailable(reason)) => {
                    warn!(%username, %reason, "relational store lost mid-pass");
                    report.relational_reachable = false;
                    report.failures += 1;
                }
                Err(err) => {
                    warn!(%username, error = %err, "relational rejected sync effect");
                    report.failures += 1;
                }
            }
        }

        // Step 5: Snapshot re-serialization
        report.snapshot_written = self.persist_snapshot(relational, fallback);

        info!(
            relational = report.relational_reachable,
            replayed = report.journal.entries_applied,
            snapshot = report.snapshot_accounts,
            fallback_created = report.fallback_created,
            fallback_updated = report.fallback_updated,
            relational_created = report.relational_created,
            relational_updated = report.relational_updated,
            failures = report.failures,
            "reconciliation pass complete"
        );
        report
    }

    /// Merged view of both live stores, ordered by username
    pub fn merged_view(&self, relational: &RelationalStore, fallback: &FallbackStore) -> Vec<Account> {
        let relational_accounts = if relational.is_connected() {
            relational
                .read_all()
                .map(index_by_username)
                .unwrap_or_else(|err| {
                    debug!(error = %err, "relational unavailable for merged view");
                    BTreeMap::new()
                })
        } else {
            BTreeMap::new()
        };
        let fallback_accounts = index_by_username(fallback.read_all().unwrap_or_default());

        let usernames: BTreeSet<&String> = relational_accounts
            .keys()
            .chain(fallback_accounts.keys())
            .collect();

        usernames
            .into_iter()
            .filter_map(|username| {
                merge(
                    relational_accounts.get(username),
                    fallback_accounts.get(username),
                    None,
                    self.divergence,
                )
            })
            .map(|merged| merged.account)
            .collect()
    }

    /// Rewrite the snapshot from the merged view; true if the file changed
    pub fn persist_snapshot(&self, relational: &RelationalStore, fallback: &FallbackStore) -> bool {
        let view = self.merged_view(relational, fallback);
        match SnapshotWriter::write(&self.snapshot_path, &view, self.delimiter) {
            Ok(written) => written,
            Err(err) => {
                error!(path = %self.snapshot_path.display(), error = %err, "snapshot write failed");
                false
            }
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn load_snapshot(
        &self,
        scope: SnapshotScope<'_>,
        report: &mut ReconcileReport,
    ) -> BTreeMap<String, Account> {
        if scope == SnapshotScope::Skip {
            return BTreeMap::new();
        }

        let load = match SnapshotReader::load(&self.snapshot_path) {
            Ok(load) => load,
            Err(err) => {
                warn!(path = %self.snapshot_path.display(), error = %err, "snapshot unreadable, ignoring it this pass");
                return BTreeMap::new();
            }
        };
        report.snapshot_skipped = load.skipped.len();

        let deleted = self.deleted.lock();
        let accounts: BTreeMap<String, Account> = load
            .accounts
            .into_iter()
            .filter(|account| match scope {
                SnapshotScope::Except(username) => account.username != username,
                _ => true,
            })
            .filter(|account| {
                let suppressed = deleted.contains(&account.username);
                if suppressed {
                    debug!(username = %account.username, "snapshot lists a deleted account, not re-creating");
                }
                !suppressed
            })
            .map(|account| (account.username.clone(), account))
            .collect();

        report.snapshot_accounts = accounts.len();
        accounts
    }
}

fn index_by_username(accounts: Vec<Account>) -> BTreeMap<String, Account> {
    accounts
        .into_iter()
        .map(|account| (account.username.clone(), account))
        .collect()
}

fn apply<S: AccountStore>(store: &S, username: &str, action: &StoreAction) -> Result<Applied> {
    match action {
        StoreAction::Unchanged => Ok(Applied::Nothing),
        StoreAction::Create(account) => {
            debug!(%username, store = store.name(), "seeding account");
            match store.create(account) {
                Ok(()) => Ok(Applied::Created),
                // Created by a concurrent writer since the views were read
                Err(SyncDirError::DuplicateKey { field: "username", .. }) => {
                    debug!(%username, store = store.name(), "account already exists");
                    Ok(Applied::Nothing)
                }
                Err(err) => Err(err),
            }
        }
        StoreAction::Update(patch) => {
            debug!(%username, store = store.name(), "updating fields");
            store.update(username, patch)?;
            Ok(Applied::Updated)
        }
    }
}
