//! Sync Module
//!
//! Reconciles the relational store, the fallback store and the snapshot.
//!
//! ## Structure
//! - `merge`: pure per-username three-way merge producing one record and
//!   the effect each live store needs to hold it
//! - `SyncEngine`: runs reconciliation passes and applies those effects
//!
//! ## Conflict Policy (per field)
//! ```text
//!  existence   present anywhere ─▶ created where absent (snapshot seeds)
//!  role        snapshot ▶ live store   (only when values differ)
//!  password    snapshot ▶ live store   (a known password fills an empty one)
//!  email       snapshot ▶ live store
//!  other       relational vs fallback ─▶ DivergencePolicy
//!  created     never rewritten
//! ```

mod engine;
mod merge;

pub use engine::{ReconcileReport, SnapshotScope, SyncEngine};
pub use merge::{merge, MergedAccount, StoreAction};
