//! Directory Module
//!
//! The single entry point callers use to read and write accounts.
//!
//! ## Responsibilities
//! - Dispatch to the relational store first, fall back to the fallback store
//! - Write best effort to relational, unconditionally to fallback
//! - Queue writes the relational store missed
//! - Trigger a reconciliation pass (and snapshot rewrite) after every write
//! - Keep store failures from leaking: callers see a value or a
//!   business-level error, never `Unavailable`

use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::account::{generate_password, Account, AccountPatch, Credential, Role};
use crate::config::Config;
use crate::error::{Result, SyncDirError};
use crate::journal::PendingWrite;
use crate::store::{AccountStore, FallbackStore, RelationalStore};
use crate::sync::{ReconcileReport, SnapshotScope, SyncEngine};

/// Profile fields a user can edit (`None` leaves a field as it is)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
}

impl ProfileUpdate {
    fn into_patch(self) -> AccountPatch {
        AccountPatch {
            name: self.name.map(Some),
            email: self.email,
            age: self.age.map(Some),
            ..AccountPatch::default()
        }
    }
}

/// The account directory
///
/// ## Concurrency Model
///
/// - **Reads** (login, exists checks, listing): take `gate` shared
/// - **Writes and reconciliation passes**: take `gate` exclusively, so at
///   most one pass is in flight and no read sees a half-applied pass
///
/// Safe to share through `Arc` (e.g. with a reconnect loop).
pub struct Directory {
    config: Config,

    /// SQLite store (owns its connection state)
    relational: RelationalStore,

    /// In-process store, always present
    fallback: FallbackStore,

    /// Reconciliation and the pending-write journal
    engine: SyncEngine,

    gate: RwLock<()>,
}

impl Directory {
    // =========================================================================
    // Internal File Names
    // =========================================================================
    const DATABASE_FILENAME: &'static str = "accounts.db";
    const SNAPSHOT_FILENAME: &'static str = "accounts.txt";

    /// Open a directory with the given config
    ///
    /// On open:
    /// 1. Validate config
    /// 2. Try to connect the relational store (failure is not fatal)
    /// 3. Run one full reconciliation pass (imports the snapshot)
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let directory = Self {
            relational: RelationalStore::new(&config.database_path, config.connect_timeout()),
            fallback: FallbackStore::new(),
            engine: SyncEngine::new(&config),
            gate: RwLock::new(()),
            config,
        };

        if directory.config.connect_on_open {
            if let Err(err) = directory.relational.connect() {
                warn!(error = %err, "relational store unreachable, running on the fallback store");
            }
        }

        let report = {
            let _gate = directory.gate.write();
            directory
                .engine
                .reconcile(&directory.relational, &directory.fallback, SnapshotScope::Full)
        };
        info!(
            accounts = directory.fallback.len(),
            relational = report.relational_reachable,
            "directory open"
        );
        Ok(directory)
    }

    /// Open with database and snapshot inside `dir` (convenience method)
    pub fn open_in(dir: &Path) -> Result<Self> {
        let config = Config::builder()
            .database_path(dir.join(Self::DATABASE_FILENAME))
            .snapshot_path(dir.join(Self::SNAPSHOT_FILENAME))
            .build();
        Self::open(config)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Check a username/password pair.
    ///
    /// Relational first; on a miss, mismatch or outage the fallback store is
    /// asked. An empty password never matches here.
    pub fn login(&self, username: &str, password: &str) -> Option<Account> {
        if password.is_empty() {
            debug!(%username, "login with empty password rejected");
            return None;
        }
        self.authenticate(username, Credential::Password(password))
    }

    /// Re-read the profile of an already authenticated user without a
    /// credential check.
    ///
    /// Call only after `login` succeeded for `username` in the same session.
    /// Never route a username from external input here: it bypasses the
    /// password entirely.
    pub fn reload_profile(&self, username: &str) -> Option<Account> {
        self.authenticate(username, Credential::ProfileReload)
    }

    /// True if either live store holds the username
    pub fn username_exists(&self, username: &str) -> bool {
        let _gate = self.gate.read();
        self.username_taken(username)
    }

    /// True if either live store holds the email
    pub fn email_exists(&self, email: &str) -> bool {
        let _gate = self.gate.read();
        self.email_owner(email).is_some()
    }

    /// Merged view of every account, ordered by username
    pub fn all_accounts(&self) -> Vec<Account> {
        let _gate = self.gate.read();
        self.engine.merged_view(&self.relational, &self.fallback)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a Customer account.
    ///
    /// Rejected with `DuplicateKey` if the username, or a non-empty email,
    /// exists in either store.
    pub fn register(&self, username: &str, password: &str, email: &str) -> Result<()> {
        validate_username(username)?;
        validate_email(email)?;

        let _gate = self.gate.write();

        if self.username_taken(username) {
            return Err(SyncDirError::DuplicateKey {
                field: "username",
                value: username.to_string(),
            });
        }
        if !email.is_empty() && self.email_owner(email).is_some() {
            return Err(SyncDirError::DuplicateKey {
                field: "email",
                value: email.to_string(),
            });
        }

        let account = Account::new(username, password, email, Role::Customer);
        self.dual_write(
            "register",
            PendingWrite::Create(account.clone()),
            |store| store.create(&account),
            |store| store.create(&account),
        )?;

        self.engine.forget_deletion(username);
        info!(%username, "account registered");
        self.sync_after_write(SnapshotScope::Except(username));
        Ok(())
    }

    /// Update name, email and/or age
    pub fn update_profile(&self, username: &str, update: ProfileUpdate) -> Result<()> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        let patch = update.into_patch();
        if patch.is_empty() {
            return Err(SyncDirError::InvalidInput("profile update is empty".to_string()));
        }

        let _gate = self.gate.write();

        if let Some(email) = patch.email.as_deref().filter(|email| !email.is_empty()) {
            if let Some(owner) = self.email_owner(email) {
                if owner != username {
                    return Err(SyncDirError::DuplicateKey {
                        field: "email",
                        value: email.to_string(),
                    });
                }
            }
        }

        self.write_patch("update_profile", username, patch)?;
        info!(%username, "profile updated");
        self.sync_after_write(SnapshotScope::Except(username));
        Ok(())
    }

    /// Assign a role on behalf of `actor`.
    ///
    /// The role string is normalized first. Admins may assign any role,
    /// Managers only Customer, Customers nothing.
    pub fn change_role(&self, username: &str, role: &str, actor: Role) -> Result<()> {
        let role = Role::normalize(role);
        if !actor.may_assign(role) {
            return Err(SyncDirError::PermissionDenied(format!(
                "{} may not assign role {}",
                actor, role
            )));
        }

        let _gate = self.gate.write();
        self.write_patch("change_role", username, AccountPatch::role(role))?;
        info!(%username, %role, "role changed");
        self.sync_after_write(SnapshotScope::Except(username));
        Ok(())
    }

    /// Replace the password with a generated one and return it
    pub fn reset_password(&self, username: &str) -> Result<String> {
        let password = generate_password();

        let _gate = self.gate.write();
        self.write_patch("reset_password", username, AccountPatch::password(password.clone()))?;
        info!(%username, "password reset");
        self.sync_after_write(SnapshotScope::Except(username));
        Ok(password)
    }

    /// Delete an account from every reachable store
    pub fn delete_user(&self, username: &str) -> Result<()> {
        let _gate = self.gate.write();
        self.dual_write(
            "delete_user",
            PendingWrite::Delete {
                username: username.to_string(),
            },
            |store| store.delete(username),
            |store| store.delete(username),
        )?;

        self.engine.record_deletion(username);
        info!(%username, "account deleted");
        self.sync_after_write(SnapshotScope::Except(username));
        Ok(())
    }

    /// Delete every account; returns how many were visible beforehand
    pub fn delete_all(&self) -> Result<usize> {
        let _gate = self.gate.write();
        let doomed = self.engine.merged_view(&self.relational, &self.fallback);

        self.dual_write(
            "delete_all",
            PendingWrite::DeleteAll,
            |store| store.delete_all().map(|_| ()),
            |store| store.delete_all().map(|_| ()),
        )?;

        for account in &doomed {
            self.engine.record_deletion(&account.username);
        }
        info!(count = doomed.len(), "all accounts deleted");
        self.sync_after_write(SnapshotScope::Skip);
        Ok(doomed.len())
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Run a full reconciliation pass now.
    ///
    /// A disconnected relational store gets one connect attempt first.
    pub fn reconcile_now(&self) -> ReconcileReport {
        let _gate = self.gate.write();
        if !self.relational.is_connected() {
            if let Err(err) = self.relational.connect() {
                debug!(error = %err, "reconnect attempt failed");
            }
        }
        self.engine
            .reconcile(&self.relational, &self.fallback, SnapshotScope::Full)
    }

    /// Try to (re)connect the relational store.
    ///
    /// A successful reconnection runs one full reconciliation pass.
    pub fn reconnect(&self) -> bool {
        let _gate = self.gate.write();
        if self.relational.is_connected() {
            return true;
        }
        match self.relational.connect() {
            Ok(()) => {
                self.engine
                    .reconcile(&self.relational, &self.fallback, SnapshotScope::Full);
                true
            }
            Err(err) => {
                debug!(error = %err, "reconnect attempt failed");
                false
            }
        }
    }

    /// Drop the relational connection
    pub fn disconnect(&self) {
        let _gate = self.gate.write();
        self.relational.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.relational.is_connected()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn relational(&self) -> &RelationalStore {
        &self.relational
    }

    pub fn fallback(&self) -> &FallbackStore {
        &self.fallback
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Writes queued for the relational store
    pub fn pending_writes(&self) -> usize {
        self.engine.journal().len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers (callers hold the gate)
    // =========================================================================

    fn authenticate(&self, username: &str, credential: Credential<'_>) -> Option<Account> {
        let _gate = self.gate.read();

        match self.relational.read(username) {
            Ok(Some(account)) if credential.accepts(&account) => {
                debug!(%username, source = "relational", "account matched");
                return Some(account);
            }
            Ok(Some(_)) => debug!(%username, "relational credential mismatch"),
            Ok(None) => debug!(%username, "not in relational store"),
            Err(err) => debug!(%username, error = %err, "relational store skipped"),
        }

        match self.fallback.read(username) {
            Ok(Some(account)) if credential.accepts(&account) => {
                debug!(%username, source = "fallback", "account matched");
                Some(account)
            }
            _ => {
                debug!(%username, "no matching account");
                None
            }
        }
    }

    fn username_taken(&self, username: &str) -> bool {
        self.relational.username_exists(username).unwrap_or(false)
            || self.fallback.username_exists(username).unwrap_or(false)
    }

    fn email_owner(&self, email: &str) -> Option<String> {
        self.relational
            .owner_of_email(email)
            .ok()
            .flatten()
            .or_else(|| self.fallback.owner_of_email(email))
    }

    fn write_patch(&self, op: &'static str, username: &str, patch: AccountPatch) -> Result<()> {
        self.dual_write(
            op,
            PendingWrite::Update {
                username: username.to_string(),
                patch: patch.clone(),
            },
            |store| store.update(username, &patch),
            |store| store.update(username, &patch),
        )
    }

    /// Best effort on the relational store, unconditional on the fallback
    /// store; succeeds if either accepted. A write the relational store missed
    /// because it was unavailable is queued for replay.
    fn dual_write(
        &self,
        op: &'static str,
        pending: PendingWrite,
        relational: impl FnOnce(&RelationalStore) -> Result<()>,
        fallback: impl FnOnce(&FallbackStore) -> Result<()>,
    ) -> Result<()> {
        let relational_result = relational(&self.relational);
        let fallback_result = fallback(&self.fallback);

        if let Err(err) = &relational_result {
            debug!(op, error = %err, "relational store did not take the write");
            if err.is_unavailable() && fallback_result.is_ok() {
                self.engine.journal().append(pending);
            }
        }
        if let Err(err) = &fallback_result {
            debug!(op, error = %err, "fallback store did not take the write");
        }

        match (relational_result, fallback_result) {
            (Ok(()), _) | (_, Ok(())) => Ok(()),
            (Err(relational_err), Err(fallback_err)) => {
                if relational_err.is_unavailable() {
                    Err(fallback_err)
                } else {
                    Err(relational_err)
                }
            }
        }
    }

    fn sync_after_write(&self, scope: SnapshotScope<'_>) {
        let report = self.engine.reconcile(&self.relational, &self.fallback, scope);
        debug!(writes = report.writes(), "post-write reconciliation");
    }
}

/// Usernames must survive a snapshot round trip
fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(SyncDirError::InvalidInput("username must not be blank".to_string()));
    }
    if username.trim() != username {
        return Err(SyncDirError::InvalidInput(
            "username must not start or end with whitespace".to_string(),
        ));
    }
    if username.contains(['|', ',', '\n', '\r']) {
        return Err(SyncDirError::InvalidInput(format!(
            "username '{}' contains a snapshot delimiter",
            username
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    if email.contains(['|', ',', '\n', '\r']) {
        return Err(SyncDirError::InvalidInput(format!(
            "email '{}' contains a snapshot delimiter",
            email
        )));
    }
    Ok(())
}
