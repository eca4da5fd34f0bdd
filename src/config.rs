//! Configuration for syncdir
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SyncDirError};

/// Main configuration for a directory instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Relational Store Configuration
    // -------------------------------------------------------------------------
    /// SQLite database file backing the relational store.
    /// The parent directory is never created: if it is missing the store
    /// stays `Disconnected` and the directory runs on the fallback store.
    pub database_path: PathBuf,

    /// Upper bound for a single connect attempt (milliseconds)
    pub connect_timeout_ms: u64,

    /// Attempt a connection while opening the directory
    pub connect_on_open: bool,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Human-editable flat file holding every account
    pub snapshot_path: PathBuf,

    /// Delimiter emitted by the snapshot writer (the reader accepts both)
    pub snapshot_delimiter: Delimiter,

    // -------------------------------------------------------------------------
    // Sync Policy Configuration
    // -------------------------------------------------------------------------
    /// What to do when both live stores hold an account with different values
    /// and the snapshot has no opinion
    pub divergence_policy: DivergencePolicy,

    /// Whether a deleted account listed again in the snapshot is re-created
    pub deleted_account_policy: DeletedAccountPolicy,

    // -------------------------------------------------------------------------
    // Daemon Configuration
    // -------------------------------------------------------------------------
    /// Period of the reconnect-and-sync loop (milliseconds)
    pub reconnect_interval_ms: u64,
}

/// Field delimiter for snapshot lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `ROLE | USERNAME | ...`
    Pipe,

    /// `ROLE, USERNAME, ...`
    Comma,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Pipe => '|',
            Delimiter::Comma => ',',
        }
    }

    /// Separator written between fields
    pub fn separator(&self) -> &'static str {
        match self {
            Delimiter::Pipe => " | ",
            Delimiter::Comma => ", ",
        }
    }
}

/// Resolution of relational vs fallback disagreements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergencePolicy {
    /// Leave both values alone; only absence is propagated
    Ignore,

    /// Overwrite the fallback copy with the relational one
    PreferRelational,

    /// Overwrite the relational copy with the fallback one
    PreferFallback,
}

/// Treatment of accounts deleted through the directory that the snapshot
/// still lists on a later load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedAccountPolicy {
    /// The snapshot seeds them again
    Recreate,

    /// Deleted usernames are ignored in the snapshot until re-registered
    Suppress,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./syncdir_data/accounts.db"),
            connect_timeout_ms: 3000,
            connect_on_open: true,
            snapshot_path: PathBuf::from("./accounts.txt"),
            snapshot_delimiter: Delimiter::Pipe,
            divergence_policy: DivergencePolicy::Ignore,
            deleted_account_policy: DeletedAccountPolicy::Recreate,
            reconnect_interval_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Reject settings the directory cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(SyncDirError::Config(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_interval_ms == 0 {
            return Err(SyncDirError::Config(
                "reconnect_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.database_path == self.snapshot_path {
            return Err(SyncDirError::Config(format!(
                "database and snapshot share the same path: {}",
                self.database_path.display()
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the SQLite database file
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Connect (or not) while opening the directory
    pub fn connect_on_open(mut self, connect: bool) -> Self {
        self.config.connect_on_open = connect;
        self
    }

    /// Set the snapshot file
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Set the delimiter the snapshot writer emits
    pub fn snapshot_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.config.snapshot_delimiter = delimiter;
        self
    }

    pub fn divergence_policy(mut self, policy: DivergencePolicy) -> Self {
        self.config.divergence_policy = policy;
        self
    }

    pub fn deleted_account_policy(mut self, policy: DeletedAccountPolicy) -> Self {
        self.config.deleted_account_policy = policy;
        self
    }

    /// Set the daemon loop period (in milliseconds)
    pub fn reconnect_interval_ms(mut self, ms: u64) -> Self {
        self.config.reconnect_interval_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
