//! Error types for syncdir
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using SyncDirError
pub type Result<T> = std::result::Result<T, SyncDirError>;

/// Unified error type for syncdir operations
#[derive(Debug, Error)]
pub enum SyncDirError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// The store cannot be reached. Never fatal: callers fall back.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate {field}: {value}")]
    DuplicateKey { field: &'static str, value: String },

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Malformed snapshot line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncDirError {
    /// True for connectivity failures (the store should be treated as absent)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SyncDirError::Unavailable(_))
    }
}
