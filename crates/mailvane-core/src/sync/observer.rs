//! Sync event notification interface.
//!
//! The sync engine reports state transitions through [`SyncObserver`] so
//! embedders can drive display updates without the core depending on any
//! UI framework. All methods default to no-ops; implement only the
//! events you care about.

use std::sync::{Arc, Mutex};

use crate::account::AccountId;
use crate::cache::MessageSummary;

/// Receives notifications from the sync engine and the mail service.
///
/// Implementations must be cheap and non-blocking; events are emitted
/// synchronously from within sync operations.
pub trait SyncObserver: Send + Sync {
    /// Cached summaries were used to seed an empty view before the
    /// network round-trip. `summaries` is sorted newest-first.
    fn cache_seeded(&self, account_id: AccountId, mailbox: &str, summaries: &[MessageSummary]) {
        let _ = (account_id, mailbox, summaries);
    }

    /// The mailbox's UIDVALIDITY changed; the stored cache entry was
    /// dropped and previously displayed summaries are no longer valid.
    fn cache_invalidated(&self, account_id: AccountId, mailbox: &str) {
        let _ = (account_id, mailbox);
    }

    /// A refresh finished and its result was applied. `summaries` is the
    /// final sorted set.
    fn refresh_completed(
        &self,
        account_id: AccountId,
        mailbox: &str,
        summaries: &[MessageSummary],
    ) {
        let _ = (account_id, mailbox, summaries);
    }

    /// A refresh finished after the active account changed; its result
    /// was discarded.
    fn stale_discarded(&self, account_id: AccountId, mailbox: &str) {
        let _ = (account_id, mailbox);
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// A recorded sync event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Cache seed with the number of seeded summaries.
    Seeded {
        /// Account the event belongs to.
        account_id: AccountId,
        /// Mailbox name.
        mailbox: String,
        /// Number of summaries seeded.
        count: usize,
    },
    /// Cache invalidation after a UIDVALIDITY change.
    Invalidated {
        /// Account the event belongs to.
        account_id: AccountId,
        /// Mailbox name.
        mailbox: String,
    },
    /// Completed refresh with the final summary count.
    Completed {
        /// Account the event belongs to.
        account_id: AccountId,
        /// Mailbox name.
        mailbox: String,
        /// Number of summaries in the applied result.
        count: usize,
    },
    /// Discarded stale refresh result.
    StaleDiscarded {
        /// Account the event belongs to.
        account_id: AccountId,
        /// Mailbox name.
        mailbox: String,
    },
}

/// Observer that records every event it receives, for tests.
///
/// Clones share the same underlying log, so a test can keep one clone
/// and hand another to the service.
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl CollectingObserver {
    /// Creates an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    fn record(&self, event: SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl SyncObserver for CollectingObserver {
    fn cache_seeded(&self, account_id: AccountId, mailbox: &str, summaries: &[MessageSummary]) {
        self.record(SyncEvent::Seeded {
            account_id,
            mailbox: mailbox.to_string(),
            count: summaries.len(),
        });
    }

    fn cache_invalidated(&self, account_id: AccountId, mailbox: &str) {
        self.record(SyncEvent::Invalidated {
            account_id,
            mailbox: mailbox.to_string(),
        });
    }

    fn refresh_completed(
        &self,
        account_id: AccountId,
        mailbox: &str,
        summaries: &[MessageSummary],
    ) {
        self.record(SyncEvent::Completed {
            account_id,
            mailbox: mailbox.to_string(),
            count: summaries.len(),
        });
    }

    fn stale_discarded(&self, account_id: AccountId, mailbox: &str) {
        self.record(SyncEvent::StaleDiscarded {
            account_id,
            mailbox: mailbox.to_string(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn collecting_observer_records_in_order() {
        let observer = CollectingObserver::new();
        let id = AccountId::new();

        observer.cache_seeded(id, "INBOX", &[]);
        observer.cache_invalidated(id, "INBOX");
        observer.stale_discarded(id, "Archive");

        assert_eq!(
            observer.events(),
            vec![
                SyncEvent::Seeded {
                    account_id: id,
                    mailbox: "INBOX".to_string(),
                    count: 0,
                },
                SyncEvent::Invalidated {
                    account_id: id,
                    mailbox: "INBOX".to_string(),
                },
                SyncEvent::StaleDiscarded {
                    account_id: id,
                    mailbox: "Archive".to_string(),
                },
            ]
        );
    }

    #[test]
    fn clones_share_the_log() {
        let observer = CollectingObserver::new();
        let clone = observer.clone();

        clone.cache_invalidated(AccountId::new(), "INBOX");

        assert_eq!(observer.events().len(), 1);
    }

    #[test]
    fn noop_observer_accepts_events() {
        let observer = NoopObserver;
        observer.refresh_completed(AccountId::new(), "INBOX", &[]);
    }
}
