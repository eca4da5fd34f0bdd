//! Pending-Write Journal Module
//!
//! Writes the fallback store accepted while the relational store was
//! unreachable, queued for later propagation.
//!
//! ## Responsibilities
//! - Append an entry for every write the relational store missed
//! - Sequence numbers for ordering
//! - Replay in order on the next reconciliation pass with a live connection
//!
//! ## Entry Layout
//! ```text
//! ┌─────────┬───────────────┬──────────────────────────────┐
//! │ Seq u64 │ Timestamp u64 │ PendingWrite                 │
//! │         │ unix millis   │ Create | Update | Delete | * │
//! └─────────┴───────────────┴──────────────────────────────┘
//! ```
//!
//! The journal lives in process memory, like the fallback store it shadows.

mod entry;
mod queue;
mod replay;

pub use entry::{JournalEntry, PendingWrite};
pub use queue::PendingJournal;
pub use replay::ReplayResult;
