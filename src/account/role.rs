//! Account roles

use std::fmt;

/// One of the three fixed account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Role {
    #[default]
    Customer,
    Manager,
    Admin,
}

impl Role {
    /// Map any input string onto a role.
    ///
    /// Case-insensitive and whitespace-tolerant; empty or unrecognized
    /// input yields `Customer`.
    pub fn normalize(input: &str) -> Role {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else if trimmed.eq_ignore_ascii_case("manager") {
            Role::Manager
        } else {
            Role::Customer
        }
    }

    /// Canonical spelling, as stored and written to the snapshot
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
        }
    }

    /// Whether an actor holding this role may assign `target` to someone
    pub fn may_assign(&self, target: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::Manager => target == Role::Customer,
            Role::Customer => false,
        }
    }
}

impl From<&str> for Role {
    fn from(input: &str) -> Self {
        Role::normalize(input)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
