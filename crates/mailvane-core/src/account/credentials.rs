//! Secure password storage using the system keyring.
//!
//! Passwords are never written to the account database. Each account's
//! password lives in the platform credential store:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::debug;

use super::AccountId;
use crate::Result;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailvane";

/// Generates the keyring entry key for an account's password.
fn credential_key(account_id: AccountId) -> String {
    format!("account.{}.password", account_id.0)
}

/// Stores a password in the system keyring, replacing any existing one.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn store_password(account_id: AccountId, password: &str) -> Result<()> {
    let key = credential_key(account_id);
    let entry = Entry::new(SERVICE_NAME, &key)?;
    entry.set_password(password)?;
    debug!("Stored password for account {account_id}");
    Ok(())
}

/// Retrieves a password from the system keyring.
///
/// A missing entry is not an error: it yields `Ok(None)` so callers can
/// treat absence as a recoverable condition.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn get_password(account_id: AccountId) -> Result<Option<String>> {
    let key = credential_key(account_id);
    let entry = Entry::new(SERVICE_NAME, &key)?;
    match entry.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            debug!("No password found for account {account_id}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes an account's password from the keyring.
///
/// Tolerates a missing entry.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn delete_password(account_id: AccountId) -> Result<()> {
    let key = credential_key(account_id);
    let entry = Entry::new(SERVICE_NAME, &key)?;
    match entry.delete_credential() {
        Ok(()) => {
            debug!("Deleted password for account {account_id}");
            Ok(())
        }
        Err(keyring::Error::NoEntry) => {
            debug!("No password to delete for account {account_id}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::unreadable_literal,
    clippy::similar_names
)]
mod tests {
    // Note: These tests interact with the actual system keyring.
    // They are marked as ignored by default to avoid polluting the keyring
    // during automated testing. Run manually with `cargo test -- --ignored`

    use super::*;

    #[test]
    fn key_format() {
        let id = AccountId::new();
        assert_eq!(credential_key(id), format!("account.{}.password", id.0));
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve_password() {
        let account_id = AccountId::new();
        let password = "test_password_12345";

        store_password(account_id, password).unwrap();

        let retrieved = get_password(account_id).unwrap();
        assert_eq!(retrieved, Some(password.to_string()));

        delete_password(account_id).unwrap();
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_missing_password_is_none() {
        let account_id = AccountId::new();
        assert_eq!(get_password(account_id).unwrap(), None);
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_delete_tolerates_missing_entry() {
        let account_id = AccountId::new();
        delete_password(account_id).unwrap();
    }
}
