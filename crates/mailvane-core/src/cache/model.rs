//! Cache data models.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// A lightweight message summary for list display.
///
/// This is the unit the sync engine fetches, merges, and caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Message UID within its mailbox.
    pub uid: u32,
    /// Decoded subject (empty if the header was missing).
    pub subject: String,
    /// Decoded sender (empty if the header was missing).
    pub from: String,
    /// Parsed date, if the Date header was present and parsable.
    pub date: Option<DateTime<FixedOffset>>,
    /// Plain-text preview of the body, if one could be extracted.
    pub preview: Option<String>,
}

/// Cached state of one mailbox for one account.
///
/// `uid_validity` and `uid_next` record what the server reported at the
/// last sync; either may be absent when the server omitted the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxCache {
    /// Account this cache belongs to.
    pub account_id: AccountId,
    /// Mailbox name.
    pub mailbox: String,
    /// UIDVALIDITY at last sync.
    pub uid_validity: Option<u32>,
    /// UIDNEXT at last sync.
    pub uid_next: Option<u32>,
    /// Cached message summaries.
    pub summaries: Vec<MessageSummary>,
    /// When this entry was written.
    pub last_updated: DateTime<Utc>,
}
