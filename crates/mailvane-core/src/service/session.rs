//! Per-account IMAP session ownership.
//!
//! [`MailSession`] pairs an account with a connection-level session and
//! handles credential acquisition: the password is fetched from the
//! keyring once per connection attempt, and a missing password fails
//! before any network I/O. The [`MailboxOps`] trait is the seam the sync
//! engine drives, so engine and service behavior can be tested against a
//! scripted implementation.

use std::collections::HashMap;

use mailvane_imap::FetchedMessage;
use mailvane_imap::connection::Session;
use mailvane_imap::types::{MailboxStatus, Uid};
use mailvane_mime::ParsedHeaders;
use mailvane_mime::encoding::decode_text;
use mailvane_mime::preview::preview_text;

use crate::account::{Account, credentials};
use crate::cache::MessageSummary;
use crate::{Error, Result};

/// Mailbox operations the sync engine needs from a session.
///
/// Methods that touch a mailbox take its name and select it first when
/// necessary; callers never manage selection state themselves.
pub trait MailboxOps {
    /// Queries UIDVALIDITY and UIDNEXT for a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating, or the command fails.
    async fn mailbox_status(&mut self, mailbox: &str) -> Result<MailboxStatus>;

    /// Lists all mailbox names, deduplicated and sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating, or the command fails.
    async fn list_mailboxes(&mut self) -> Result<Vec<String>>;

    /// Returns every UID in the mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating, selecting, or the
    /// command fails.
    async fn search_all(&mut self, mailbox: &str) -> Result<Vec<Uid>>;

    /// Returns the UIDs in `start..=end`, or `start:*` when `end` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating, selecting, or the
    /// command fails.
    async fn search_range(
        &mut self,
        mailbox: &str,
        start: Uid,
        end: Option<Uid>,
    ) -> Result<Vec<Uid>>;

    /// Fetches header and preview summaries for the given UIDs.
    ///
    /// The result follows the requested UID order; UIDs the server did
    /// not answer for are omitted. An empty request issues no command.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating, selecting, or the
    /// command fails.
    async fn fetch_summaries(
        &mut self,
        mailbox: &str,
        uids: &[Uid],
    ) -> Result<Vec<MessageSummary>>;

    /// Fetches a message's body text, decoded as UTF-8 with a Latin-1
    /// fallback.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting, authenticating, selecting, or the
    /// command fails.
    async fn fetch_body_text(&mut self, mailbox: &str, uid: Uid) -> Result<String>;

    /// Drops the connection. The next operation reconnects from scratch.
    fn disconnect(&mut self);
}

/// An account's IMAP session.
#[derive(Debug)]
pub struct MailSession {
    account: Account,
    session: Session,
}

impl MailSession {
    /// Creates an unconnected session for the account. No I/O happens
    /// until the first operation.
    #[must_use]
    pub fn new(account: &Account) -> Self {
        Self {
            account: account.clone(),
            session: Session::new(account.session_config()),
        }
    }

    /// The account this session belongs to.
    #[must_use]
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Connects and logs in if not already authenticated.
    ///
    /// The password is read from the keyring per attempt; absence is a
    /// fatal precondition error raised before any I/O.
    async fn ensure_authenticated(&mut self) -> Result<()> {
        if self.session.is_authenticated() {
            return Ok(());
        }

        let password = credentials::get_password(self.account.id)?
            .ok_or(Error::MissingCredential(self.account.id))?;
        self.session.ensure_authenticated(&password).await?;
        Ok(())
    }

    async fn ensure_selected(&mut self, mailbox: &str) -> Result<()> {
        self.ensure_authenticated().await?;
        self.session.select(mailbox).await?;
        Ok(())
    }
}

impl MailboxOps for MailSession {
    async fn mailbox_status(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.ensure_authenticated().await?;
        Ok(self.session.status(mailbox).await?)
    }

    async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        self.ensure_authenticated().await?;
        Ok(self.session.list_mailboxes().await?)
    }

    async fn search_all(&mut self, mailbox: &str) -> Result<Vec<Uid>> {
        self.ensure_selected(mailbox).await?;
        Ok(self.session.uid_search_all().await?)
    }

    async fn search_range(
        &mut self,
        mailbox: &str,
        start: Uid,
        end: Option<Uid>,
    ) -> Result<Vec<Uid>> {
        self.ensure_selected(mailbox).await?;
        Ok(self.session.uid_search_range(start, end).await?)
    }

    async fn fetch_summaries(
        &mut self,
        mailbox: &str,
        uids: &[Uid],
    ) -> Result<Vec<MessageSummary>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_selected(mailbox).await?;
        let fetched = self.session.fetch_headers_with_preview(uids).await?;

        let mut by_uid: HashMap<Uid, FetchedMessage> =
            fetched.into_iter().map(|m| (m.uid, m)).collect();
        Ok(uids
            .iter()
            .filter_map(|uid| by_uid.remove(uid))
            .map(summarize)
            .collect())
    }

    async fn fetch_body_text(&mut self, mailbox: &str, uid: Uid) -> Result<String> {
        self.ensure_selected(mailbox).await?;
        let data = self.session.fetch_body(uid).await?;
        Ok(decode_text(&data))
    }

    fn disconnect(&mut self) {
        self.session.disconnect();
    }
}

/// Builds a display summary from a fetched message.
fn summarize(message: FetchedMessage) -> MessageSummary {
    let headers = ParsedHeaders::parse(&message.headers);
    let preview = preview_text(message.preview.as_deref());
    MessageSummary {
        uid: message.uid.get(),
        subject: headers.subject,
        from: headers.from,
        date: headers.date,
        preview,
    }
}

/// Creates sessions for accounts.
///
/// The mail service goes through this factory so tests can substitute
/// scripted sessions.
pub trait SessionFactory: Send + Sync {
    /// Session type produced by this factory.
    type Session: MailboxOps + Send + 'static;

    /// Creates an unconnected session for the account.
    fn create(&self, account: &Account) -> Self::Session;
}

/// Factory producing real IMAP sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapSessionFactory;

impl SessionFactory for ImapSessionFactory {
    type Session = MailSession;

    fn create(&self, account: &Account) -> MailSession {
        MailSession::new(account)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::DateTime;

    use super::*;

    #[test]
    fn summarize_decodes_headers_and_preview() {
        let message = FetchedMessage {
            uid: Uid::new(42).unwrap(),
            headers: b"Subject: =?utf-8?B?SMOpbGxv?=\r\nFrom: Alice <alice@example.com>\r\nDate: Mon, 01 Jan 2024 10:00:00 +0000\r\n"
                .to_vec(),
            preview: Some(b"Hello there\r\n".to_vec()),
        };

        let summary = summarize(message);
        assert_eq!(summary.uid, 42);
        assert_eq!(summary.subject, "H\u{e9}llo");
        assert_eq!(summary.from, "Alice <alice@example.com>");
        assert_eq!(
            summary.date,
            Some(DateTime::parse_from_rfc2822("Mon, 01 Jan 2024 10:00:00 +0000").unwrap())
        );
        assert_eq!(summary.preview, Some("Hello there".to_string()));
    }

    #[test]
    fn summarize_handles_missing_headers() {
        let message = FetchedMessage {
            uid: Uid::new(7).unwrap(),
            headers: Vec::new(),
            preview: None,
        };

        let summary = summarize(message);
        assert_eq!(summary.uid, 7);
        assert!(summary.subject.is_empty());
        assert!(summary.from.is_empty());
        assert_eq!(summary.date, None);
        assert_eq!(summary.preview, None);
    }

    #[test]
    fn new_session_is_unconnected() {
        let account = Account::new("user@example.com", "imap.example.com");
        let session = MailSession::new(&account);
        assert_eq!(session.account().email, "user@example.com");
    }

    #[tokio::test]
    async fn empty_fetch_answers_without_io() {
        // TEST-NET address; the guard must return before any connection
        // or credential lookup is attempted.
        let account = Account::new("user@example.com", "198.51.100.1");
        let mut session = MailSession::new(&account);

        let result = session.fetch_summaries("INBOX", &[]).await.unwrap();
        assert!(result.is_empty());
    }
}
