//! Scripted sessions for exercising the sync pipeline without a server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::DateTime;
use tokio::sync::oneshot;

use mailvane_imap::types::{MailboxStatus, Uid, UidValidity};

use crate::Result;
use crate::account::{Account, AccountId};
use crate::cache::MessageSummary;
use crate::service::session::{MailboxOps, SessionFactory};

/// One recorded session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Status { mailbox: String },
    List,
    SearchAll { mailbox: String },
    SearchRange {
        mailbox: String,
        start: u32,
        end: Option<u32>,
    },
    Fetch { mailbox: String, uids: Vec<u32> },
    Body { mailbox: String, uid: u32 },
    Disconnect,
}

/// Shared call log; clones observe the same session.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    /// Snapshot of the calls recorded so far, in order.
    pub fn snapshot(&self) -> Vec<Call> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: Call) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// [`MailboxOps`] implementation that answers from fixed data.
///
/// `uids` is the full UID set "on the server"; searches filter it,
/// fetches answer from the `summaries` map in requested order. An
/// optional gate parks the first status call until released, so tests
/// can interleave other work mid-refresh.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    status: MailboxStatus,
    fail_status: bool,
    uids: Vec<u32>,
    summaries: HashMap<u32, MessageSummary>,
    bodies: HashMap<u32, String>,
    mailboxes: Vec<String>,
    gate: Option<oneshot::Receiver<()>>,
    log: CallLog,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: MailboxStatus) -> Self {
        self.status = status;
        self
    }

    /// Makes every status call fail with a connection error.
    pub fn fail_status(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub fn uids(mut self, uids: Vec<u32>) -> Self {
        self.uids = uids;
        self
    }

    pub fn summary(mut self, summary: MessageSummary) -> Self {
        self.summaries.insert(summary.uid, summary);
        self
    }

    pub fn body(mut self, uid: u32, text: &str) -> Self {
        self.bodies.insert(uid, text.to_string());
        self
    }

    pub fn mailboxes(mut self, mailboxes: Vec<String>) -> Self {
        self.mailboxes = mailboxes;
        self
    }

    /// Parks the first status call until the sender fires.
    pub fn gated(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Handle to this session's call log.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl MailboxOps for ScriptedSession {
    async fn mailbox_status(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.log.record(Call::Status {
            mailbox: mailbox.to_string(),
        });
        if let Some(gate) = self.gate.take() {
            let _ = gate.await;
        }
        if self.fail_status {
            return Err(mailvane_imap::Error::ConnectionClosed.into());
        }
        Ok(self.status)
    }

    async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        self.log.record(Call::List);
        Ok(self.mailboxes.clone())
    }

    async fn search_all(&mut self, mailbox: &str) -> Result<Vec<Uid>> {
        self.log.record(Call::SearchAll {
            mailbox: mailbox.to_string(),
        });
        Ok(self.uids.iter().copied().filter_map(Uid::new).collect())
    }

    async fn search_range(
        &mut self,
        mailbox: &str,
        start: Uid,
        end: Option<Uid>,
    ) -> Result<Vec<Uid>> {
        self.log.record(Call::SearchRange {
            mailbox: mailbox.to_string(),
            start: start.get(),
            end: end.map(Uid::get),
        });
        Ok(self
            .uids
            .iter()
            .copied()
            .filter(|&n| n >= start.get() && end.is_none_or(|e| n <= e.get()))
            .filter_map(Uid::new)
            .collect())
    }

    async fn fetch_summaries(
        &mut self,
        mailbox: &str,
        uids: &[Uid],
    ) -> Result<Vec<MessageSummary>> {
        self.log.record(Call::Fetch {
            mailbox: mailbox.to_string(),
            uids: uids.iter().copied().map(Uid::get).collect(),
        });
        Ok(uids
            .iter()
            .filter_map(|uid| self.summaries.get(&uid.get()).cloned())
            .collect())
    }

    async fn fetch_body_text(&mut self, mailbox: &str, uid: Uid) -> Result<String> {
        self.log.record(Call::Body {
            mailbox: mailbox.to_string(),
            uid: uid.get(),
        });
        Ok(self.bodies.get(&uid.get()).cloned().unwrap_or_default())
    }

    fn disconnect(&mut self) {
        self.log.record(Call::Disconnect);
    }
}

/// Factory that hands out prepared sessions per account.
///
/// Each prepared session is consumed by one `create` call; accounts
/// without one get an empty default session.
#[derive(Debug, Default)]
pub struct ScriptedFactory {
    sessions: Mutex<HashMap<AccountId, ScriptedSession>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(&self, account_id: AccountId, session: ScriptedSession) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account_id, session);
    }
}

impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    fn create(&self, account: &Account) -> ScriptedSession {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&account.id)
            .unwrap_or_default()
    }
}

/// Builds a status value; zero means the counter is absent.
pub fn status(uid_validity: u32, uid_next: u32) -> MailboxStatus {
    MailboxStatus {
        uid_validity: UidValidity::new(uid_validity),
        uid_next: Uid::new(uid_next),
    }
}

/// Builds a summary with a fixed subject and sender; an empty `date`
/// yields an undated message.
pub fn summary(uid: u32, date: &str) -> MessageSummary {
    MessageSummary {
        uid,
        subject: format!("Message {uid}"),
        from: "sender@example.com".to_string(),
        date: DateTime::parse_from_rfc2822(date).ok(),
        preview: None,
    }
}
