//! Error types for the core library.

use thiserror::Error;

use crate::account::AccountId;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailvane_imap::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] keyring::Error),

    /// No password is stored for the account.
    ///
    /// Raised before any network I/O is attempted.
    #[error("No stored password for account {0}")]
    MissingCredential(AccountId),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No account is currently active.
    #[error("No active account")]
    NoActiveAccount,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
