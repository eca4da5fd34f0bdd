//! Account record and partial updates

use chrono::{Local, NaiveDateTime, SubsecRound};

use super::Role;

/// Timestamp format used by the relational store and the snapshot
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A user account as held by every store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub role: Role,

    /// Identity key: case-sensitive, never blank, immutable
    pub username: String,

    /// Opaque secret, compared verbatim
    pub password: String,

    pub email: String,

    /// Set once at creation, never mutated
    pub created_date: NaiveDateTime,

    pub original_username: String,

    pub name: Option<String>,
    pub age: Option<u32>,
}

impl Account {
    /// Create a fresh account stamped with the current time
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        let username = username.into();
        Self {
            role,
            original_username: username.clone(),
            username,
            password: password.into(),
            email: email.into(),
            created_date: Self::now(),
            name: None,
            age: None,
        }
    }

    /// Current local time truncated to whole seconds
    pub fn now() -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(0)
    }

    /// Parse a stored timestamp; anything unparseable becomes "now"
    pub fn parse_created_date(raw: &str) -> NaiveDateTime {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("N/A") {
            return Self::now();
        }
        NaiveDateTime::parse_from_str(raw, DATE_FORMAT).unwrap_or_else(|_| Self::now())
    }

    pub fn created_date_string(&self) -> String {
        self.created_date.format(DATE_FORMAT).to_string()
    }

    /// Apply a patch in place; returns true if any field changed
    pub fn apply(&mut self, patch: &AccountPatch) -> bool {
        let before = self.clone();
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(password) = &patch.password {
            self.password = password.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        *self != before
    }
}

/// Partial update of the mutable account fields.
///
/// `name` and `age` are doubly optional: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub role: Option<Role>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub name: Option<Option<String>>,
    pub age: Option<Option<u32>>,
}

impl AccountPatch {
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.password.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.age.is_none()
    }
}

/// What a login presents to a store
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    Password(&'a str),

    /// Internal profile reload: the password check is skipped
    ProfileReload,
}

impl Credential<'_> {
    pub fn accepts(&self, account: &Account) -> bool {
        match self {
            Credential::Password(password) => account.password == *password,
            Credential::ProfileReload => true,
        }
    }
}
