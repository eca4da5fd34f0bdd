//! Store Module
//!
//! The two live account stores and the contract they share.
//!
//! ## Stores
//! - `RelationalStore`: SQLite-backed, authoritative when reachable, owns the
//!   uniqueness constraints on username and email. Every call can fail with
//!   `Unavailable`.
//! - `FallbackStore`: in-process ordered map, always present. Fails only
//!   with `DuplicateKey` on create and `NotFound` on update/delete.
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │  AccountStore    │
//!                 └────────┬─────────┘
//!            ┌─────────────┴─────────────┐
//!            ▼                           ▼
//!   ┌─────────────────┐        ┌──────────────────┐
//!   │ RelationalStore │        │  FallbackStore   │
//!   │ Mutex<ConnState>│        │ RwLock<BTreeMap> │
//!   └─────────────────┘        └──────────────────┘
//! ```

mod fallback;
mod relational;

pub use fallback::FallbackStore;
pub use relational::{ConnectionState, RelationalStore};

use crate::account::{Account, AccountPatch};
use crate::error::Result;

/// Operations every account store supports
pub trait AccountStore {
    /// Short name for log lines
    fn name(&self) -> &'static str;

    fn username_exists(&self, username: &str) -> Result<bool>;

    fn email_exists(&self, email: &str) -> Result<bool>;

    /// Insert a new account (`DuplicateKey` if the username is taken)
    fn create(&self, account: &Account) -> Result<()>;

    fn read(&self, username: &str) -> Result<Option<Account>>;

    /// All accounts ordered by username
    fn read_all(&self) -> Result<Vec<Account>>;

    /// Apply a patch (`NotFound` if the username is absent)
    fn update(&self, username: &str, patch: &AccountPatch) -> Result<()>;

    /// Remove an account (`NotFound` if the username is absent)
    fn delete(&self, username: &str) -> Result<()>;

    /// Remove every account, returning how many were removed
    fn delete_all(&self) -> Result<usize>;
}
