//! Multi-account mail service.
//!
//! [`MailService`] owns one session per account, the persistent stores,
//! and the current mailbox view. Refreshes run through the sync engine
//! under the account's session lock, so cache reads and writes for one
//! account never interleave. A generation counter stamps every refresh;
//! results arriving after an account switch carry a stale stamp and are
//! discarded instead of overwriting the new account's view.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use mailvane_imap::types::Uid;

use crate::account::{Account, AccountId, AccountRepository, credentials};
use crate::cache::{CacheRepository, MessageSummary};
use crate::service::session::{ImapSessionFactory, MailboxOps, SessionFactory};
use crate::sync::engine::{self, DEFAULT_SUMMARY_LIMIT};
use crate::sync::{MailboxView, NoopObserver, SyncObserver};
use crate::{Error, Result};

/// Mailbox refreshed by [`MailService::refresh_inbox`].
pub const INBOX: &str = "INBOX";

#[derive(Debug, Default)]
struct ViewState {
    active: Option<AccountId>,
    view: MailboxView,
}

/// Coordinates accounts, sessions, cache, and the mailbox view.
pub struct MailService<F: SessionFactory = ImapSessionFactory> {
    factory: F,
    accounts: AccountRepository,
    cache: CacheRepository,
    sessions: StdMutex<HashMap<AccountId, Arc<AsyncMutex<F::Session>>>>,
    state: StdMutex<ViewState>,
    generation: AtomicU64,
    observer: Box<dyn SyncObserver>,
    summary_limit: usize,
}

impl MailService {
    /// Creates a service backed by real IMAP sessions.
    #[must_use]
    pub fn new(accounts: AccountRepository, cache: CacheRepository) -> Self {
        Self::with_factory(ImapSessionFactory, accounts, cache)
    }
}

impl<F: SessionFactory> MailService<F> {
    /// Creates a service with a custom session factory.
    pub fn with_factory(factory: F, accounts: AccountRepository, cache: CacheRepository) -> Self {
        Self {
            factory,
            accounts,
            cache,
            sessions: StdMutex::new(HashMap::new()),
            state: StdMutex::new(ViewState::default()),
            generation: AtomicU64::new(0),
            observer: Box::new(NoopObserver),
            summary_limit: DEFAULT_SUMMARY_LIMIT,
        }
    }

    /// Replaces the no-op observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl SyncObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Overrides how many summaries a full fetch keeps.
    #[must_use]
    pub fn with_summary_limit(mut self, limit: usize) -> Self {
        self.summary_limit = limit;
        self
    }

    /// The account registry.
    #[must_use]
    pub const fn accounts(&self) -> &AccountRepository {
        &self.accounts
    }

    /// The mailbox cache store.
    #[must_use]
    pub const fn cache(&self) -> &CacheRepository {
        &self.cache
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<AccountId, Arc<AsyncMutex<F::Session>>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an account and stores its password in the keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the account or the password fails.
    pub async fn add_account(&self, account: &Account, password: &str) -> Result<()> {
        self.accounts.save(account).await?;
        credentials::store_password(account.id, password)?;
        info!(account = %account.id, email = %account.email, "account added");
        Ok(())
    }

    /// All registered accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.accounts.list().await
    }

    /// Removes an account together with its cached mail, stored password,
    /// and live session.
    ///
    /// # Errors
    ///
    /// Returns an error if deleting the account or its cache fails.
    pub async fn delete_account(&self, account_id: AccountId) -> Result<()> {
        self.accounts.delete(account_id).await?;
        self.cache.delete_account(account_id).await?;

        if let Some(session) = self.sessions().remove(&account_id) {
            disconnect_in_background(session);
        }

        let mut state = self.state();
        if state.active == Some(account_id) {
            state.active = None;
            state.view.clear();
            drop(state);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        info!(account = %account_id, "account deleted");
        Ok(())
    }

    /// Makes an account the active one, clearing the view.
    ///
    /// The previous account's session is disconnected in the background;
    /// any refresh still running against it will be discarded as stale.
    /// Selecting the already-active account is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] for an unregistered account id.
    pub async fn select_account(&self, account_id: AccountId) -> Result<()> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(Error::AccountNotFound(account_id))?;

        let previous = {
            let mut state = self.state();
            if state.active == Some(account_id) {
                return Ok(());
            }
            let previous = state.active.take();
            state.active = Some(account_id);
            state.view.clear();
            previous
        };
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(previous) = previous
            && let Some(session) = self.sessions().remove(&previous)
        {
            disconnect_in_background(session);
        }

        self.sessions()
            .entry(account_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(self.factory.create(&account))));
        debug!(account = %account_id, "account selected");
        Ok(())
    }

    /// The active account, if any.
    #[must_use]
    pub fn active_account(&self) -> Option<AccountId> {
        self.state().active
    }

    /// Refreshes the active account's inbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveAccount`] without an active account, or
    /// any session or cache error from the refresh.
    pub async fn refresh_inbox(&self) -> Result<()> {
        self.refresh_mailbox(INBOX).await
    }

    /// Refreshes a mailbox of the active account and applies the result
    /// to the view.
    ///
    /// If the active account changed while the refresh was in flight, the
    /// result is discarded and the observer is told; the refreshed data
    /// is still cached for the account it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveAccount`] without an active account, or
    /// any session or cache error from the refresh.
    pub async fn refresh_mailbox(&self, mailbox: &str) -> Result<()> {
        let account_id = self.active_account().ok_or(Error::NoActiveAccount)?;
        let session = self.session_for(account_id).await?;
        let generation = self.generation.load(Ordering::SeqCst);
        let view_is_empty = self.state().view.is_empty();

        let bridge = ViewBridge {
            state: &self.state,
            generation: &self.generation,
            expected: generation,
            inner: self.observer.as_ref(),
        };

        let summaries = {
            let mut ops = session.lock().await;
            engine::refresh_mailbox(
                &mut *ops,
                &self.cache,
                &bridge,
                account_id,
                mailbox,
                view_is_empty,
                self.summary_limit,
            )
            .await?
        };

        let applied = {
            let mut state = self.state();
            let fresh = self.generation.load(Ordering::SeqCst) == generation
                && state.active == Some(account_id);
            if fresh {
                state.view.set_summaries(summaries.clone());
                state.view.select_newest_if_none();
            }
            fresh
        };

        if applied {
            self.observer
                .refresh_completed(account_id, mailbox, &summaries);
        } else {
            debug!(account = %account_id, mailbox, "discarding stale refresh result");
            self.observer.stale_discarded(account_id, mailbox);
        }
        Ok(())
    }

    /// Summaries currently in the view, newest first.
    #[must_use]
    pub fn summaries(&self) -> Vec<MessageSummary> {
        self.state().view.summaries().to_vec()
    }

    /// UID of the selected message, if any.
    #[must_use]
    pub fn selected_uid(&self) -> Option<u32> {
        self.state().view.selected_uid()
    }

    /// Selects a message by UID; UIDs not in the view are ignored.
    pub fn select_message(&self, uid: u32) {
        self.state().view.select(uid);
    }

    /// Fetches the body text of the selected message.
    ///
    /// Returns `Ok(None)` when nothing is selected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveAccount`] without an active account, or
    /// any session error from the fetch.
    pub async fn selected_body(&self, mailbox: &str) -> Result<Option<String>> {
        let account_id = self.active_account().ok_or(Error::NoActiveAccount)?;
        let Some(selected) = self.state().view.selected_uid().and_then(Uid::new) else {
            return Ok(None);
        };

        let session = self.session_for(account_id).await?;
        let mut ops = session.lock().await;
        let body = ops.fetch_body_text(mailbox, selected).await?;
        Ok(Some(body))
    }

    /// Lists the active account's mailboxes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveAccount`] without an active account, or
    /// any session error from the listing.
    pub async fn list_mailboxes(&self) -> Result<Vec<String>> {
        let account_id = self.active_account().ok_or(Error::NoActiveAccount)?;
        let session = self.session_for(account_id).await?;
        let mut ops = session.lock().await;
        ops.list_mailboxes().await
    }

    async fn session_for(&self, account_id: AccountId) -> Result<Arc<AsyncMutex<F::Session>>> {
        if let Some(existing) = self.sessions().get(&account_id) {
            return Ok(existing.clone());
        }

        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(Error::AccountNotFound(account_id))?;
        let created = Arc::new(AsyncMutex::new(self.factory.create(&account)));
        Ok(self.sessions().entry(account_id).or_insert(created).clone())
    }
}

impl<F: SessionFactory> fmt::Debug for MailService<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailService")
            .field("active", &self.active_account())
            .field("summary_limit", &self.summary_limit)
            .finish_non_exhaustive()
    }
}

/// Applies cache seeds to the view while the refresh that produced them
/// is still current, and forwards every event to the outer observer.
struct ViewBridge<'a> {
    state: &'a StdMutex<ViewState>,
    generation: &'a AtomicU64,
    expected: u64,
    inner: &'a dyn SyncObserver,
}

impl SyncObserver for ViewBridge<'_> {
    fn cache_seeded(&self, account_id: AccountId, mailbox: &str, summaries: &[MessageSummary]) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if self.generation.load(Ordering::SeqCst) == self.expected
                && state.active == Some(account_id)
                && state.view.is_empty()
            {
                state.view.set_summaries(summaries.to_vec());
            }
        }
        self.inner.cache_seeded(account_id, mailbox, summaries);
    }

    fn cache_invalidated(&self, account_id: AccountId, mailbox: &str) {
        self.inner.cache_invalidated(account_id, mailbox);
    }

    fn refresh_completed(
        &self,
        account_id: AccountId,
        mailbox: &str,
        summaries: &[MessageSummary],
    ) {
        self.inner.refresh_completed(account_id, mailbox, summaries);
    }

    fn stale_discarded(&self, account_id: AccountId, mailbox: &str) {
        self.inner.stale_discarded(account_id, mailbox);
    }
}

fn disconnect_in_background<S>(session: Arc<AsyncMutex<S>>)
where
    S: MailboxOps + Send + 'static,
{
    tokio::spawn(async move {
        session.lock().await.disconnect();
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use tokio::sync::oneshot;

    use super::*;
    use crate::cache::MailboxCache;
    use crate::service::testing::{Call, CallLog, ScriptedFactory, ScriptedSession, status, summary};
    use crate::sync::{CollectingObserver, SyncEvent};

    async fn service(
        factory: ScriptedFactory,
    ) -> (MailService<ScriptedFactory>, CollectingObserver) {
        let accounts = AccountRepository::in_memory().await.unwrap();
        let cache = CacheRepository::in_memory().await.unwrap();
        let observer = CollectingObserver::new();
        let svc = MailService::with_factory(factory, accounts, cache)
            .with_observer(observer.clone());
        (svc, observer)
    }

    async fn register(svc: &MailService<ScriptedFactory>, email: &str) -> Account {
        let account = Account::new(email, "imap.example.com");
        svc.accounts().save(&account).await.unwrap();
        account
    }

    /// Yields until the log records a disconnect, so the spawned cleanup
    /// task gets a chance to run.
    async fn wait_for_disconnect(log: &CallLog) {
        for _ in 0..100 {
            if log.snapshot().contains(&Call::Disconnect) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("session was never disconnected");
    }

    #[tokio::test]
    async fn refresh_populates_view_and_selects_newest() {
        let factory = ScriptedFactory::new();
        let session = ScriptedSession::new()
            .status(status(1, 4))
            .uids(vec![1, 2, 3])
            .summary(summary(1, "Mon, 01 Jan 2024 10:00:00 +0000"))
            .summary(summary(2, "Tue, 02 Jan 2024 10:00:00 +0000"))
            .summary(summary(3, "Wed, 03 Jan 2024 10:00:00 +0000"));

        let (svc, observer) = service(factory).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory.prepare(account.id, session);

        svc.select_account(account.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();

        let uids: Vec<u32> = svc.summaries().iter().map(|s| s.uid).collect();
        assert_eq!(uids, vec![3, 2, 1]);
        assert_eq!(svc.selected_uid(), Some(3));

        assert_eq!(
            observer.events(),
            vec![SyncEvent::Completed {
                account_id: account.id,
                mailbox: INBOX.to_string(),
                count: 3,
            }]
        );
    }

    #[tokio::test]
    async fn refresh_without_active_account_fails() {
        let (svc, _) = service(ScriptedFactory::new()).await;
        assert!(matches!(svc.refresh_inbox().await, Err(Error::NoActiveAccount)));
    }

    #[tokio::test]
    async fn view_seeds_from_cache_before_fetch() {
        let (svc, observer) = service(ScriptedFactory::new()).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory
            .prepare(account.id, ScriptedSession::new().status(status(1, 10)));

        svc.cache()
            .save(&MailboxCache {
                account_id: account.id,
                mailbox: INBOX.to_string(),
                uid_validity: Some(1),
                uid_next: Some(10),
                summaries: vec![summary(9, "")],
                last_updated: Utc::now(),
            })
            .await
            .unwrap();

        svc.select_account(account.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();

        assert_eq!(
            observer.events(),
            vec![
                SyncEvent::Seeded {
                    account_id: account.id,
                    mailbox: INBOX.to_string(),
                    count: 1,
                },
                SyncEvent::Completed {
                    account_id: account.id,
                    mailbox: INBOX.to_string(),
                    count: 1,
                },
            ]
        );
        assert_eq!(svc.summaries().len(), 1);
    }

    #[tokio::test]
    async fn account_switch_discards_stale_refresh() {
        let (gate_tx, gate_rx) = oneshot::channel();
        let factory = ScriptedFactory::new();

        let slow = ScriptedSession::new()
            .status(status(1, 2))
            .uids(vec![1])
            .summary(summary(1, ""))
            .gated(gate_rx);
        let slow_log = slow.log();

        let (svc, observer) = service(factory).await;
        let first = register(&svc, "first@example.com").await;
        let second = register(&svc, "second@example.com").await;
        svc.factory.prepare(first.id, slow);
        svc.factory.prepare(second.id, ScriptedSession::new());

        let svc = Arc::new(svc);
        svc.select_account(first.id).await.unwrap();

        let refresh = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.refresh_inbox().await })
        };

        // Let the refresh park inside its status call.
        while slow_log.snapshot().is_empty() {
            tokio::task::yield_now().await;
        }

        svc.select_account(second.id).await.unwrap();
        gate_tx.send(()).unwrap();
        refresh.await.unwrap().unwrap();

        assert!(observer.events().contains(&SyncEvent::StaleDiscarded {
            account_id: first.id,
            mailbox: INBOX.to_string(),
        }));
        assert!(svc.summaries().is_empty());
        assert_eq!(svc.active_account(), Some(second.id));

        // The stale result is still cached for the account it belongs to.
        let cached = svc.cache().load(first.id, INBOX).await.unwrap().unwrap();
        assert_eq!(cached.summaries.len(), 1);

        wait_for_disconnect(&slow_log).await;
    }

    #[tokio::test]
    async fn switching_accounts_resets_view_and_disconnects() {
        let factory = ScriptedFactory::new();
        let session = ScriptedSession::new()
            .status(status(1, 2))
            .uids(vec![1])
            .summary(summary(1, ""));
        let log = session.log();

        let (svc, _) = service(factory).await;
        let first = register(&svc, "first@example.com").await;
        let second = register(&svc, "second@example.com").await;
        svc.factory.prepare(first.id, session);
        svc.factory.prepare(second.id, ScriptedSession::new());

        svc.select_account(first.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();
        assert_eq!(svc.summaries().len(), 1);

        svc.select_account(second.id).await.unwrap();
        assert!(svc.summaries().is_empty());
        assert_eq!(svc.selected_uid(), None);
        assert_eq!(svc.active_account(), Some(second.id));

        wait_for_disconnect(&log).await;
    }

    #[tokio::test]
    async fn reselecting_active_account_keeps_view() {
        let factory = ScriptedFactory::new();
        let session = ScriptedSession::new()
            .status(status(1, 2))
            .uids(vec![1])
            .summary(summary(1, ""));

        let (svc, _) = service(factory).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory.prepare(account.id, session);

        svc.select_account(account.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();

        svc.select_account(account.id).await.unwrap();
        assert_eq!(svc.summaries().len(), 1);
        assert_eq!(svc.selected_uid(), Some(1));
    }

    #[tokio::test]
    async fn selected_body_fetches_selected_message() {
        let factory = ScriptedFactory::new();
        let session = ScriptedSession::new()
            .status(status(1, 4))
            .uids(vec![2, 3])
            .summary(summary(2, ""))
            .summary(summary(3, ""))
            .body(3, "Hello body");
        let log = session.log();

        let (svc, _) = service(factory).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory.prepare(account.id, session);

        svc.select_account(account.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();

        // Newest message was auto-selected.
        assert_eq!(svc.selected_uid(), Some(3));
        let body = svc.selected_body(INBOX).await.unwrap();
        assert_eq!(body.as_deref(), Some("Hello body"));
        assert!(log.snapshot().contains(&Call::Body {
            mailbox: INBOX.to_string(),
            uid: 3,
        }));
    }

    #[tokio::test]
    async fn selected_body_without_selection_is_none() {
        let factory = ScriptedFactory::new();
        let session = ScriptedSession::new();
        let log = session.log();

        let (svc, _) = service(factory).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory.prepare(account.id, session);

        svc.select_account(account.id).await.unwrap();
        let body = svc.selected_body(INBOX).await.unwrap();
        assert_eq!(body, None);
        assert!(log.snapshot().is_empty());
    }

    #[tokio::test]
    async fn select_message_overrides_auto_selection() {
        let factory = ScriptedFactory::new();
        let session = ScriptedSession::new()
            .status(status(1, 3))
            .uids(vec![1, 2])
            .summary(summary(1, ""))
            .summary(summary(2, ""));

        let (svc, _) = service(factory).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory.prepare(account.id, session);

        svc.select_account(account.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();

        svc.select_message(1);
        assert_eq!(svc.selected_uid(), Some(1));

        // UIDs not in the view are ignored.
        svc.select_message(99);
        assert_eq!(svc.selected_uid(), Some(1));
    }

    #[tokio::test]
    async fn delete_account_clears_state_and_cache() {
        let factory = ScriptedFactory::new();
        let session = ScriptedSession::new()
            .status(status(1, 2))
            .uids(vec![1])
            .summary(summary(1, ""));
        let log = session.log();

        let (svc, _) = service(factory).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory.prepare(account.id, session);

        svc.select_account(account.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();
        assert!(svc.cache().load(account.id, INBOX).await.unwrap().is_some());

        svc.delete_account(account.id).await.unwrap();

        assert_eq!(svc.active_account(), None);
        assert!(svc.summaries().is_empty());
        assert!(svc.cache().load(account.id, INBOX).await.unwrap().is_none());
        assert!(svc.accounts().get(account.id).await.unwrap().is_none());
        assert!(matches!(
            svc.select_account(account.id).await,
            Err(Error::AccountNotFound(_))
        ));

        wait_for_disconnect(&log).await;
    }

    #[tokio::test]
    async fn refresh_error_leaves_view_untouched() {
        let factory = ScriptedFactory::new();
        let working = ScriptedSession::new()
            .status(status(1, 2))
            .uids(vec![1])
            .summary(summary(1, ""));

        let (svc, observer) = service(factory).await;
        let account = register(&svc, "user@example.com").await;
        svc.factory.prepare(account.id, working);

        svc.select_account(account.id).await.unwrap();
        svc.refresh_inbox().await.unwrap();
        assert_eq!(svc.summaries().len(), 1);

        // Swap in a failing session for the same account.
        svc.sessions().insert(
            account.id,
            Arc::new(AsyncMutex::new(ScriptedSession::new().fail_status())),
        );

        assert!(svc.refresh_inbox().await.is_err());
        assert_eq!(svc.summaries().len(), 1);
        assert_eq!(
            observer
                .events()
                .iter()
                .filter(|e| matches!(e, SyncEvent::Completed { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    #[ignore = "Interacts with system keyring"]
    async fn add_account_stores_credentials() {
        let (svc, _) = service(ScriptedFactory::new()).await;
        let account = Account::new("keyring@example.com", "imap.example.com");

        svc.add_account(&account, "hunter2").await.unwrap();
        let stored = credentials::get_password(account.id).unwrap();
        assert_eq!(stored.as_deref(), Some("hunter2"));

        credentials::delete_password(account.id).unwrap();
    }
}
