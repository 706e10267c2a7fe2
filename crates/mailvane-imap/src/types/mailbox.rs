//! Mailbox types.

use super::{Uid, UidValidity};

/// Mailbox counters reported by `STATUS` or `SELECT`.
///
/// Either field may be absent when the server omits the corresponding
/// token. A reported value of 0 is treated as absent, since neither a
/// UID nor a UIDVALIDITY of 0 is meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
}

impl MailboxStatus {
    /// Creates an empty status with both fields absent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
