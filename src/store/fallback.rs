//! Fallback store
//!
//! BTreeMap-based account store with RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::account::{Account, AccountPatch};
use crate::error::{Result, SyncDirError};

use super::AccountStore;

/// In-process account store used when the relational store is unreachable.
///
/// Keys are usernames; the BTreeMap keeps them ordered so `read_all` is
/// already in snapshot order.
pub struct FallbackStore {
    accounts: RwLock<BTreeMap<String, Account>>,
}

impl FallbackStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of accounts held
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Username owning `email`, if any
    pub fn owner_of_email(&self, email: &str) -> Option<String> {
        self.accounts
            .read()
            .values()
            .find(|account| account.email == email)
            .map(|account| account.username.clone())
    }
}

impl Default for FallbackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for FallbackStore {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self.accounts.read().contains_key(username))
    }

    fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.owner_of_email(email).is_some())
    }

    fn create(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&account.username) {
            return Err(SyncDirError::DuplicateKey {
                field: "username",
                value: account.username.clone(),
            });
        }
        accounts.insert(account.username.clone(), account.clone());
        Ok(())
    }

    fn read(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(username).cloned())
    }

    fn read_all(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().values().cloned().collect())
    }

    fn update(&self, username: &str, patch: &AccountPatch) -> Result<()> {
        let mut accounts = self.accounts.write();
        match accounts.get_mut(username) {
            Some(account) => {
                account.apply(patch);
                Ok(())
            }
            None => Err(SyncDirError::NotFound(username.to_string())),
        }
    }

    fn delete(&self, username: &str) -> Result<()> {
        match self.accounts.write().remove(username) {
            Some(_) => Ok(()),
            None => Err(SyncDirError::NotFound(username.to_string())),
        }
    }

    fn delete_all(&self) -> Result<usize> {
        let mut accounts = self.accounts.write();
        let removed = accounts.len();
        accounts.clear();
        Ok(removed)
    }
}
