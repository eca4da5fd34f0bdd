//! Tests for the account model
//!
//! These tests verify:
//! - Role normalization is total and case-insensitive
//! - Role-assignment rules per actor
//! - Patch application and credential checks
//! - Generated passwords

use chrono::Timelike;
use syncdir::account::{
    generate_password, Account, AccountPatch, Credential, Role, DATE_FORMAT,
    GENERATED_PASSWORD_LEN,
};

// =============================================================================
// Role Normalization Tests
// =============================================================================

#[test]
fn test_normalize_is_case_insensitive() {
    for input in ["admin", "ADMIN", "Admin", "aDmIn", "  admin  "] {
        assert_eq!(Role::normalize(input), Role::Admin, "input {:?}", input);
    }
    for input in ["manager", "MANAGER", "Manager", "\tmanager\n"] {
        assert_eq!(Role::normalize(input), Role::Manager, "input {:?}", input);
    }
    for input in ["customer", "CUSTOMER", "Customer"] {
        assert_eq!(Role::normalize(input), Role::Customer, "input {:?}", input);
    }
}

#[test]
fn test_normalize_unknown_or_empty_is_customer() {
    for input in ["", "   ", "root", "administrator", "mgr", "admin!", "N/A", "ß"] {
        assert_eq!(Role::normalize(input), Role::Customer, "input {:?}", input);
    }
}

#[test]
fn test_normalize_is_total() {
    // Every generated input lands on exactly one of the three roles
    let alphabet = ['a', 'd', 'm', 'i', 'n', 'A', 'G', 'E', 'R', ' ', '|', 'é'];
    for len in 0..4 {
        let mut indices = vec![0usize; len];
        loop {
            let input: String = indices.iter().map(|&i| alphabet[i]).collect();
            let role = Role::normalize(&input);
            assert!(matches!(role, Role::Customer | Role::Manager | Role::Admin));

            // Advance odometer
            let mut pos = 0;
            while pos < len {
                indices[pos] += 1;
                if indices[pos] < alphabet.len() {
                    break;
                }
                indices[pos] = 0;
                pos += 1;
            }
            if pos == len {
                break;
            }
        }
    }
}

#[test]
fn test_role_from_str_and_display() {
    assert_eq!(Role::from("manager"), Role::Manager);
    assert_eq!(Role::Admin.to_string(), "Admin");
    assert_eq!(Role::default(), Role::Customer);
}

// =============================================================================
// Role Assignment Tests
// =============================================================================

#[test]
fn test_admin_may_assign_any_role() {
    for target in [Role::Customer, Role::Manager, Role::Admin] {
        assert!(Role::Admin.may_assign(target));
    }
}

#[test]
fn test_manager_may_only_assign_customer() {
    assert!(Role::Manager.may_assign(Role::Customer));
    assert!(!Role::Manager.may_assign(Role::Manager));
    assert!(!Role::Manager.may_assign(Role::Admin));
}

#[test]
fn test_customer_may_assign_nothing() {
    for target in [Role::Customer, Role::Manager, Role::Admin] {
        assert!(!Role::Customer.may_assign(target));
    }
}

// =============================================================================
// Account Record Tests
// =============================================================================

#[test]
fn test_new_account_defaults() {
    let account = Account::new("alice", "pw", "alice@example.com", Role::Customer);

    assert_eq!(account.original_username, "alice");
    assert_eq!(account.name, None);
    assert_eq!(account.age, None);
    assert_eq!(account.created_date.nanosecond(), 0);
}

#[test]
fn test_created_date_string_uses_date_format() {
    let account = Account {
        created_date: Account::parse_created_date("2023-12-31 23:59:59"),
        ..Account::new("bob", "pw", "", Role::Customer)
    };

    assert_eq!(account.created_date_string(), "2023-12-31 23:59:59");
    assert_eq!(DATE_FORMAT, "%Y-%m-%d %H:%M:%S");
}

#[test]
fn test_parse_created_date_na_is_now() {
    let before = Account::now();
    let parsed = Account::parse_created_date("N/A");
    let after = Account::now();

    assert!(parsed >= before && parsed <= after);
}

#[test]
fn test_patch_clears_and_sets_profile_fields() {
    let mut account = Account::new("carol", "pw", "c@example.com", Role::Customer);
    account.name = Some("Carol".to_string());

    let patch = AccountPatch {
        name: Some(None),
        age: Some(Some(41)),
        ..AccountPatch::default()
    };
    assert!(account.apply(&patch));

    assert_eq!(account.name, None);
    assert_eq!(account.age, Some(41));
    assert_eq!(account.email, "c@example.com");
}

#[test]
fn test_empty_patch() {
    let mut account = Account::new("dave", "pw", "", Role::Manager);
    let patch = AccountPatch::default();

    assert!(patch.is_empty());
    assert!(!account.apply(&patch));
}

// =============================================================================
// Credential Tests
// =============================================================================

#[test]
fn test_password_credential_compares_verbatim() {
    let account = Account::new("erin", "Secret", "", Role::Customer);

    assert!(Credential::Password("Secret").accepts(&account));
    assert!(!Credential::Password("secret").accepts(&account));
    assert!(!Credential::Password("Secret ").accepts(&account));
}

#[test]
fn test_profile_reload_skips_password() {
    let account = Account::new("frank", "Secret", "", Role::Customer);
    assert!(Credential::ProfileReload.accepts(&account));
}

// =============================================================================
// Generated Password Tests
// =============================================================================

#[test]
fn test_generated_passwords_differ() {
    let first = generate_password();
    let second = generate_password();

    assert_eq!(first.len(), GENERATED_PASSWORD_LEN);
    assert_eq!(second.len(), GENERATED_PASSWORD_LEN);
    assert_ne!(first, second);
}

#[test]
fn test_generated_password_charset() {
    let password = generate_password();
    assert!(password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!@#$%^&*".contains(c)));
}
