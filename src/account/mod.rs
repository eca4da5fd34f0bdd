//! Account Module
//!
//! The canonical user record shared by every store.
//!
//! ## Responsibilities
//! - Role normalization (total, case-insensitive, defaults to Customer)
//! - Creation timestamps at seconds precision (snapshot round-trips them)
//! - Partial updates (`AccountPatch`) applied identically by every store
//! - Credential checks, including the internal profile-reload bypass
//! - Generated passwords for resets

mod password;
mod record;
mod role;

pub use password::{generate_password, GENERATED_PASSWORD_LEN};
pub use record::{Account, AccountPatch, Credential, DATE_FORMAT};
pub use role::Role;
