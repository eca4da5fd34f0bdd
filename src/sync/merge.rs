//! Three-way merge
//!
//! Side-effect free: given what each source holds for one username, decide
//! the merged record and what each live store must do to converge on it.

use crate::account::{Account, AccountPatch};
use crate::config::DivergencePolicy;

/// Effect to apply to one live store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Store already agrees
    Unchanged,

    /// Store lacks the account
    Create(Account),

    /// Store holds the account with differing fields
    Update(AccountPatch),
}

impl StoreAction {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, StoreAction::Unchanged)
    }
}

/// Merged record plus the per-store effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedAccount {
    pub account: Account,
    pub relational: StoreAction,
    pub fallback: StoreAction,
}

/// Merge one username across the three sources.
///
/// Returns `None` only when no source holds the username.
///
/// The base record comes from the relational store when present
/// (`PreferFallback` flips that). A snapshot record then overrides role,
/// password and email. Without a snapshot opinion an empty password is
/// filled from whichever live store knows one. Creation date and original
/// username always come from the base record.
pub fn merge(
    relational: Option<&Account>,
    fallback: Option<&Account>,
    snapshot: Option<&Account>,
    policy: DivergencePolicy,
) -> Option<MergedAccount> {
    let live = match policy {
        DivergencePolicy::PreferFallback => fallback.or(relational),
        DivergencePolicy::Ignore | DivergencePolicy::PreferRelational => relational.or(fallback),
    };
    let mut account = live.or(snapshot)?.clone();

    match snapshot {
        Some(declared) => {
            account.role = declared.role;
            account.password = declared.password.clone();
            account.email = declared.email.clone();
        }
        None if account.password.is_empty() => {
            if let Some(known) = [relational, fallback]
                .into_iter()
                .flatten()
                .map(|candidate| &candidate.password)
                .find(|password| !password.is_empty())
            {
                account.password = known.clone();
            }
        }
        None => {}
    }

    let scope = FieldScope {
        declared: snapshot.is_some() || policy != DivergencePolicy::Ignore,
        profile: policy != DivergencePolicy::Ignore,
    };

    Some(MergedAccount {
        relational: plan(relational, &account, scope),
        fallback: plan(fallback, &account, scope),
        account,
    })
}

/// Which fields a store is brought in line on
#[derive(Debug, Clone, Copy)]
struct FieldScope {
    /// role, password, email
    declared: bool,

    /// name, age
    profile: bool,
}

fn plan(current: Option<&Account>, merged: &Account, scope: FieldScope) -> StoreAction {
    let Some(current) = current else {
        return StoreAction::Create(merged.clone());
    };

    let mut patch = AccountPatch::default();

    if scope.declared && current.role != merged.role {
        patch.role = Some(merged.role);
    }
    if (scope.declared || current.password.is_empty()) && current.password != merged.password {
        patch.password = Some(merged.password.clone());
    }
    if scope.declared && current.email != merged.email {
        patch.email = Some(merged.email.clone());
    }
    if scope.profile {
        if current.name != merged.name {
            patch.name = Some(merged.name.clone());
        }
        if current.age != merged.age {
            patch.age = Some(merged.age);
        }
    }

    if patch.is_empty() {
        StoreAction::Unchanged
    } else {
        StoreAction::Update(patch)
    }
}
