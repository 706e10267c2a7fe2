//! High-level IMAP session with idempotent state transitions.
//!
//! This module provides `Session`, a wrapper around the type-state `Client`
//! that manages state transitions internally and provides a simpler
//! mutable-reference API for common operations.
//!
//! ## Design
//!
//! Callers ask for the state they need (`ensure_authenticated`, `select`)
//! and the session performs only the transitions still missing: connecting
//! when disconnected, logging in when not yet authenticated, selecting only
//! when the requested mailbox differs from the current one. Credentials are
//! supplied per login attempt and never retained.
//!
//! ## Example
//!
//! ```ignore
//! use mailvane_imap::connection::{Session, SessionConfig};
//!
//! let config = SessionConfig::new("imap.example.com", 993)
//!     .username("user@example.com");
//!
//! let mut session = Session::new(config);
//! session.ensure_authenticated(&password).await?;
//! session.select("INBOX").await?;
//! let uids = session.uid_search_all().await?;
//! ```

use super::client::{Authenticated, Client, NotAuthenticated, Selected};
use super::{Config, ImapStream, Security, connect};
use crate::fetch::FetchedMessage;
use crate::types::{MailboxStatus, Uid};
use crate::{Error, Result};

/// Configuration for an IMAP session.
///
/// Deliberately carries no password: credentials come from an external
/// store and are passed to [`Session::ensure_authenticated`] once per
/// connection attempt.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port (993 for implicit TLS, 143 for plaintext).
    pub port: u16,
    /// Transport security mode.
    pub security: Security,
    /// Username for authentication.
    pub username: String,
}

impl SessionConfig {
    /// Creates a new session configuration with implicit TLS.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            security: Security::Tls,
            username: String::new(),
        }
    }

    /// Sets the transport security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the username used for `LOGIN`.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    fn connection_config(&self) -> Config {
        Config {
            host: self.host.clone(),
            port: self.port,
            security: self.security,
        }
    }
}

/// Current state of the session.
enum SessionState {
    /// Not connected.
    Disconnected,
    /// Connected but not authenticated.
    Connected(Client<ImapStream, NotAuthenticated>),
    /// Authenticated, no mailbox selected.
    Authenticated(Client<ImapStream, Authenticated>),
    /// Mailbox selected.
    Selected(Client<ImapStream, Selected>),
}

/// High-level IMAP session with idempotent connect/login/select.
///
/// Construction performs no I/O; the connection is established lazily by
/// [`ensure_authenticated`](Self::ensure_authenticated). Repeated calls are
/// no-ops once the requested state is reached, and [`select`](Self::select)
/// skips the round-trip when the mailbox is already selected.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    /// Creates a new disconnected session.
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
        }
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true if the session has a live connection.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        !matches!(self.state, SessionState::Disconnected)
    }

    /// Returns true if the session is authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            SessionState::Authenticated(_) | SessionState::Selected(_)
        )
    }

    /// Returns the currently selected mailbox, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        match &self.state {
            SessionState::Selected(client) => Some(client.mailbox()),
            _ => None,
        }
    }

    /// Connects and logs in, skipping whichever steps are already done.
    ///
    /// The password is used for this attempt only and is not retained.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, the server greeting, or the `LOGIN`
    /// command fails. A failed login drops the connection; the next call
    /// starts from a fresh one.
    pub async fn ensure_authenticated(&mut self, password: &str) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Disconnected => {
                let stream = connect(&self.config.connection_config()).await?;
                tracing::debug!(host = %self.config.host, port = self.config.port, "connected");
                let client = Client::from_stream(stream).await?;
                let authenticated = client.login(&self.config.username, password).await?;
                tracing::debug!(username = %self.config.username, "logged in");
                self.state = SessionState::Authenticated(authenticated);
            }
            SessionState::Connected(client) => {
                let authenticated = client.login(&self.config.username, password).await?;
                tracing::debug!(username = %self.config.username, "logged in");
                self.state = SessionState::Authenticated(authenticated);
            }
            other => self.state = other,
        }
        Ok(())
    }

    /// Selects `mailbox`, skipping the round-trip when already selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not authenticated or the `SELECT`
    /// command fails.
    pub async fn select(&mut self, mailbox: &str) -> Result<()> {
        if self.selected_mailbox() == Some(mailbox) {
            return Ok(());
        }

        match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Authenticated(client) => {
                self.state = SessionState::Selected(client.select(mailbox).await?);
            }
            SessionState::Selected(client) => {
                self.state = SessionState::Selected(client.select(mailbox).await?);
            }
            other => {
                self.state = other;
                return Err(Error::InvalidState("not authenticated".into()));
            }
        }
        tracing::debug!(mailbox, "mailbox selected");
        Ok(())
    }

    /// Lists all mailbox names on the server, deduplicated and sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not authenticated or the command
    /// fails.
    pub async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        match &mut self.state {
            SessionState::Authenticated(client) => client.list().await,
            SessionState::Selected(client) => client.list().await,
            _ => Err(Error::InvalidState("not authenticated".into())),
        }
    }

    /// Queries `STATUS` for a mailbox without selecting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not authenticated or the command
    /// fails.
    pub async fn status(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        match &mut self.state {
            SessionState::Authenticated(client) => client.status(mailbox).await,
            SessionState::Selected(client) => client.status(mailbox).await,
            _ => Err(Error::InvalidState("not authenticated".into())),
        }
    }

    /// Searches for all UIDs in the selected mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected or the command fails.
    pub async fn uid_search_all(&mut self) -> Result<Vec<Uid>> {
        match &mut self.state {
            SessionState::Selected(client) => client.uid_search_all().await,
            _ => Err(Error::InvalidState("no mailbox selected".into())),
        }
    }

    /// Searches for UIDs in `start..=end`, open-ended when `end` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected or the command fails.
    pub async fn uid_search_range(&mut self, start: Uid, end: Option<Uid>) -> Result<Vec<Uid>> {
        match &mut self.state {
            SessionState::Selected(client) => client.uid_search_range(start, end).await,
            _ => Err(Error::InvalidState("no mailbox selected".into())),
        }
    }

    /// Fetches envelope headers for the given UIDs.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected or the command fails.
    pub async fn fetch_headers(&mut self, uids: &[Uid]) -> Result<Vec<FetchedMessage>> {
        match &mut self.state {
            SessionState::Selected(client) => client.fetch_headers(uids).await,
            _ => Err(Error::InvalidState("no mailbox selected".into())),
        }
    }

    /// Fetches envelope headers plus a bounded body excerpt for each UID.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected or the command fails.
    pub async fn fetch_headers_with_preview(
        &mut self,
        uids: &[Uid],
    ) -> Result<Vec<FetchedMessage>> {
        match &mut self.state {
            SessionState::Selected(client) => client.fetch_headers_with_preview(uids).await,
            _ => Err(Error::InvalidState("no mailbox selected".into())),
        }
    }

    /// Fetches the full text body of one message.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected or the command fails.
    pub async fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>> {
        match &mut self.state {
            SessionState::Selected(client) => client.fetch_body(uid).await,
            _ => Err(Error::InvalidState("no mailbox selected".into())),
        }
    }

    /// Drops the connection and resets all session state.
    ///
    /// Callable in any state; dropping the stream closes the socket. The
    /// next connection starts over with a fresh tag sequence.
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            tracing::debug!(host = %self.config.host, "disconnected");
        }
        self.state = SessionState::Disconnected;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("connected", &self.is_connected())
            .field("authenticated", &self.is_authenticated())
            .field("selected_mailbox", &self.selected_mailbox())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("imap.example.com", 993);
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Tls);
        assert!(config.username.is_empty());
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new("localhost", 143)
            .security(Security::None)
            .username("alice@example.com");
        assert_eq!(config.security, Security::None);
        assert_eq!(config.username, "alice@example.com");
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let session = Session::new(SessionConfig::new("imap.example.com", 993));
        assert!(!session.is_connected());
        assert!(!session.is_authenticated());
        assert_eq!(session.selected_mailbox(), None);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut session = Session::new(SessionConfig::new("imap.example.com", 993));
        session.disconnect();
        session.disconnect();
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_operations_require_state() {
        let mut session = Session::new(SessionConfig::new("imap.example.com", 993));

        let err = session.list_mailboxes().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let err = session.uid_search_all().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let err = session.select("INBOX").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_debug_redacts_internals() {
        let session = Session::new(SessionConfig::new("imap.example.com", 993));
        let rendered = format!("{session:?}");
        assert!(rendered.contains("imap.example.com"));
        assert!(rendered.contains("connected: false"));
    }
}
