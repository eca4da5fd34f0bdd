//! # syncdir
//!
//! An account directory that keeps user records consistent across three
//! sources:
//! - a relational store (SQLite) that may be unreachable at any moment
//! - an in-process fallback store that is always present
//! - a human-editable snapshot file that operators may edit by hand
//!
//! Callers go through one facade ([`Directory`]) and never see which store
//! served them. Every write runs a reconciliation pass so the three sources
//! converge again.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Directory (facade)                           │
//! │        login / register / update / delete / list             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ reads: relational → fallback
//!                       │ writes: both, then a sync pass
//!          ┌────────────┴────────────┬──────────────────┐
//!          │                         │                  │
//!          ▼                         ▼                  ▼
//!   ┌─────────────┐          ┌─────────────┐    ┌──────────────┐
//!   │ Relational  │          │  Fallback   │    │   Pending    │
//!   │  (SQLite)   │          │  (RwLock)   │    │   Journal    │
//!   └──────┬──────┘          └──────┬──────┘    └──────┬───────┘
//!          │                        │                  │
//!          └────────────┬───────────┴──────────────────┘
//!                       ▼
//!               ┌───────────────┐        ┌───────────────┐
//!               │  Sync Engine  │◄──────►│   Snapshot    │
//!               │ (merge/apply) │        │ (accounts.txt)│
//!               └───────────────┘        └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod account;
pub mod store;
pub mod journal;
pub mod snapshot;
pub mod sync;
pub mod directory;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use account::{Account, AccountPatch, Role};
pub use config::{Config, DeletedAccountPolicy, Delimiter, DivergencePolicy};
pub use directory::{Directory, ProfileUpdate};
pub use error::{Result, SyncDirError};
pub use sync::ReconcileReport;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of syncdir
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
