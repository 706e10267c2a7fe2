//! Account data model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mailvane_imap::connection::{Security as TransportSecurity, SessionConfig};

/// Unique identifier for an account.
///
/// Identifiers are random; they carry no ordering or provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption.
    None,
    /// TLS from connection start (recommended).
    #[default]
    Tls,
    /// STARTTLS upgrade. Declared for completeness; connecting with it
    /// is rejected as unsupported.
    StartTls,
}

impl Security {
    /// Human-readable name for display.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }

    /// Returns the conventional port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tls => 993,
            Self::None | Self::StartTls => 143,
        }
    }

    const fn transport(self) -> TransportSecurity {
        match self {
            Self::None => TransportSecurity::None,
            Self::Tls => TransportSecurity::Tls,
            Self::StartTls => TransportSecurity::StartTls,
        }
    }
}

/// An email account.
///
/// Holds everything needed to reach the IMAP server except the password,
/// which lives in the system keyring keyed by the account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Display name (may be empty).
    pub name: String,
    /// Email address.
    pub email: String,
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port.
    pub port: u16,
    /// Connection security mode.
    pub security: Security,
    /// Login username (usually the email address).
    pub username: String,
}

impl Account {
    /// Creates an account with a fresh id, TLS security, and the
    /// conventional port. The username defaults to the email address.
    #[must_use]
    pub fn new(email: impl Into<String>, host: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: AccountId::new(),
            name: String::new(),
            email: email.clone(),
            host: host.into(),
            port: Security::Tls.default_port(),
            security: Security::Tls,
            username: email,
        }
    }

    /// Name shown in account lists: the display name, or the email
    /// address when no name is set.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    /// Builds the connection-level session configuration for this account.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.host.clone(), self.port)
            .security(self.security.transport())
            .username(self.username.clone())
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
    use super::*;

    mod account_id_tests {
        use super::*;

        #[test]
        fn new_ids_are_unique() {
            let a = AccountId::new();
            let b = AccountId::new();
            assert_ne!(a, b);
        }

        #[test]
        fn display_is_uuid() {
            let id = AccountId::new();
            assert_eq!(format!("{id}"), id.0.to_string());
        }

        #[test]
        fn serde_round_trip() {
            let id = AccountId::new();
            let json = serde_json::to_string(&id).unwrap();
            let back: AccountId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, back);
        }
    }

    mod security_tests {
        use super::*;

        #[test]
        fn default_is_tls() {
            assert_eq!(Security::default(), Security::Tls);
        }

        #[test]
        fn display_names() {
            assert_eq!(Security::None.display_name(), "None");
            assert_eq!(Security::Tls.display_name(), "SSL/TLS");
            assert_eq!(Security::StartTls.display_name(), "STARTTLS");
        }

        #[test]
        fn default_ports() {
            assert_eq!(Security::Tls.default_port(), 993);
            assert_eq!(Security::None.default_port(), 143);
            assert_eq!(Security::StartTls.default_port(), 143);
        }
    }

    mod account_tests {
        use super::*;

        #[test]
        fn new_defaults() {
            let account = Account::new("user@example.com", "imap.example.com");
            assert_eq!(account.email, "user@example.com");
            assert_eq!(account.host, "imap.example.com");
            assert_eq!(account.port, 993);
            assert_eq!(account.security, Security::Tls);
            assert_eq!(account.username, "user@example.com");
            assert!(account.name.is_empty());
        }

        #[test]
        fn display_title_falls_back_to_email() {
            let mut account = Account::new("user@example.com", "imap.example.com");
            assert_eq!(account.display_title(), "user@example.com");

            account.name = "Work".to_string();
            assert_eq!(account.display_title(), "Work");
        }

        #[test]
        fn session_config_carries_connection_parameters() {
            let mut account = Account::new("user@example.com", "imap.example.com");
            account.port = 1143;
            account.security = Security::None;

            let config = account.session_config();
            assert_eq!(config.host, "imap.example.com");
            assert_eq!(config.port, 1143);
            assert_eq!(config.security, TransportSecurity::None);
            assert_eq!(config.username, "user@example.com");
        }
    }
}
