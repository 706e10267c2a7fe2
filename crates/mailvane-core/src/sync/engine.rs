//! Incremental mailbox synchronization.
//!
//! A refresh reconciles the local cache with the server in one pass:
//! seed the view from cache, compare `UIDVALIDITY`, plan the cheapest
//! fetch that closes the gap between the cached and server `UIDNEXT`,
//! merge, and persist. The planning step is pure ([`plan_fetch`]) so
//! the strategy choice is testable without a connection.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, warn};

use mailvane_imap::types::{MailboxStatus, Uid};

use crate::Result;
use crate::account::AccountId;
use crate::cache::{CacheRepository, MailboxCache, MessageSummary};
use crate::service::MailboxOps;
use crate::sync::observer::SyncObserver;

/// Number of summaries a full fetch keeps, newest first.
pub const DEFAULT_SUMMARY_LIMIT: usize = 50;

/// Fetch strategy chosen for one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// No usable cache; fetch the newest messages from scratch.
    Full,
    /// Cache is current up to `start`; fetch `start..=end`, or `start:*`
    /// when the server's `UIDNEXT` is unknown.
    Incremental {
        /// First UID that may be new.
        start: Uid,
        /// Last UID to consider, absent for an open-ended range.
        end: Option<Uid>,
    },
    /// Cache already covers everything the server reports.
    CacheHit,
}

/// Chooses the fetch strategy from the cached cursor and server counters.
///
/// Without a cache, or with a cache that never recorded `UIDNEXT`, only a
/// full fetch is sound. When the server omits `UIDNEXT` the plan stays
/// incremental but open-ended, so new mail is still found at the price of
/// re-listing from the cursor.
#[must_use]
pub fn plan_fetch(cache: Option<&MailboxCache>, status: MailboxStatus) -> FetchPlan {
    let Some(cached_next) = cache.and_then(|c| c.uid_next).and_then(Uid::new) else {
        return FetchPlan::Full;
    };

    let Some(server_next) = status.uid_next else {
        return FetchPlan::Incremental {
            start: cached_next,
            end: None,
        };
    };

    if server_next > cached_next {
        // server_next > cached_next >= 1, so the predecessor is nonzero.
        match Uid::new(server_next.get() - 1) {
            Some(end) => FetchPlan::Incremental {
                start: cached_next,
                end: Some(end),
            },
            None => FetchPlan::CacheHit,
        }
    } else {
        FetchPlan::CacheHit
    }
}

/// Whether the server's `UIDVALIDITY` contradicts the cached one.
///
/// Only a disagreement between two known values invalidates; an absent
/// value on either side proves nothing.
fn cache_is_invalid(cache: &MailboxCache, status: MailboxStatus) -> bool {
    match (cache.uid_validity, status.uid_validity) {
        (Some(cached), Some(server)) => server.get() != cached,
        _ => false,
    }
}

/// Merges fetched summaries into the cached set, keyed by UID.
///
/// A refetched UID replaces its cached entry.
fn merge_summaries(
    existing: &[MessageSummary],
    fetched: Vec<MessageSummary>,
) -> Vec<MessageSummary> {
    let mut by_uid: BTreeMap<u32, MessageSummary> = existing
        .iter()
        .map(|summary| (summary.uid, summary.clone()))
        .collect();
    for summary in fetched {
        by_uid.insert(summary.uid, summary);
    }
    by_uid.into_values().collect()
}

/// Orders summaries newest first: by date descending, undated entries
/// last, UID descending as the tiebreak.
fn sort_newest_first(summaries: &mut [MessageSummary]) {
    summaries.sort_by(|a, b| match (&a.date, &b.date) {
        (Some(left), Some(right)) => right.cmp(left).then_with(|| b.uid.cmp(&a.uid)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.uid.cmp(&a.uid),
    });
}

/// Runs one refresh of a mailbox and returns the summaries to display,
/// newest first.
///
/// Sequence: load the cache, seed an empty view from it, query server
/// counters, discard the cache on a `UIDVALIDITY` change, fetch per
/// [`plan_fetch`], merge, sort, and persist the updated cache. When the
/// server omits a counter, the previously cached value is carried
/// forward so one terse `STATUS` response does not erase the cursor.
///
/// # Errors
///
/// Returns an error if a session operation or cache access fails. The
/// cache is only written after a successful fetch.
pub async fn refresh_mailbox<O: MailboxOps>(
    ops: &mut O,
    store: &CacheRepository,
    observer: &dyn SyncObserver,
    account_id: AccountId,
    mailbox: &str,
    view_is_empty: bool,
    limit: usize,
) -> Result<Vec<MessageSummary>> {
    let mut cache = store.load(account_id, mailbox).await?;

    if view_is_empty && let Some(cached) = &cache {
        let mut seeded = cached.summaries.clone();
        sort_newest_first(&mut seeded);
        observer.cache_seeded(account_id, mailbox, &seeded);
    }

    let status = ops.mailbox_status(mailbox).await?;

    if let Some(cached) = &cache
        && cache_is_invalid(cached, status)
    {
        warn!(
            account = %account_id,
            mailbox,
            "UIDVALIDITY changed, discarding cached messages"
        );
        store.delete(account_id, mailbox).await?;
        observer.cache_invalidated(account_id, mailbox);
        cache = None;
    }

    let prior_validity = cache.as_ref().and_then(|c| c.uid_validity);
    let prior_next = cache.as_ref().and_then(|c| c.uid_next);

    let plan = plan_fetch(cache.as_ref(), status);
    debug!(account = %account_id, mailbox, ?plan, "refresh plan");

    let mut summaries = match plan {
        FetchPlan::Full => {
            let mut uids = ops.search_all(mailbox).await?;
            uids.sort_unstable();
            let keep = uids.len().saturating_sub(limit);
            ops.fetch_summaries(mailbox, &uids[keep..]).await?
        }
        FetchPlan::Incremental { start, end } => {
            let uids = ops.search_range(mailbox, start, end).await?;
            let fetched = ops.fetch_summaries(mailbox, &uids).await?;
            let existing = cache
                .as_ref()
                .map(|c| c.summaries.as_slice())
                .unwrap_or_default();
            merge_summaries(existing, fetched)
        }
        FetchPlan::CacheHit => cache
            .as_ref()
            .map(|c| c.summaries.clone())
            .unwrap_or_default(),
    };

    sort_newest_first(&mut summaries);

    let updated = MailboxCache {
        account_id,
        mailbox: mailbox.to_string(),
        uid_validity: status.uid_validity.map(|v| v.get()).or(prior_validity),
        uid_next: status.uid_next.map(Uid::get).or(prior_next),
        summaries: summaries.clone(),
        last_updated: Utc::now(),
    };
    store.save(&updated).await?;

    Ok(summaries)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::cache::CacheRepository;
    use crate::service::testing::{Call, ScriptedSession, status, summary};
    use crate::sync::observer::{CollectingObserver, NoopObserver, SyncEvent};

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    fn cached(
        account_id: AccountId,
        uid_validity: Option<u32>,
        uid_next: Option<u32>,
        summaries: Vec<MessageSummary>,
    ) -> MailboxCache {
        MailboxCache {
            account_id,
            mailbox: "INBOX".to_string(),
            uid_validity,
            uid_next,
            summaries,
            last_updated: Utc::now(),
        }
    }

    mod plan_fetch_tests {
        use super::*;

        #[test]
        fn no_cache_is_full() {
            assert_eq!(plan_fetch(None, status(1, 10)), FetchPlan::Full);
        }

        #[test]
        fn cache_without_cursor_is_full() {
            let account_id = AccountId::new();
            let no_next = cached(account_id, Some(1), None, Vec::new());
            assert_eq!(plan_fetch(Some(&no_next), status(1, 10)), FetchPlan::Full);

            let zero_next = cached(account_id, Some(1), Some(0), Vec::new());
            assert_eq!(plan_fetch(Some(&zero_next), status(1, 10)), FetchPlan::Full);
        }

        #[test]
        fn new_mail_is_incremental() {
            let cache = cached(AccountId::new(), Some(1), Some(10), Vec::new());
            assert_eq!(
                plan_fetch(Some(&cache), status(1, 14)),
                FetchPlan::Incremental {
                    start: uid(10),
                    end: Some(uid(13)),
                }
            );
        }

        #[test]
        fn unknown_server_cursor_is_open_ended() {
            let cache = cached(AccountId::new(), Some(1), Some(10), Vec::new());
            assert_eq!(
                plan_fetch(Some(&cache), status(1, 0)),
                FetchPlan::Incremental {
                    start: uid(10),
                    end: None,
                }
            );
        }

        #[test]
        fn unchanged_cursor_is_cache_hit() {
            let cache = cached(AccountId::new(), Some(1), Some(10), Vec::new());
            assert_eq!(plan_fetch(Some(&cache), status(1, 10)), FetchPlan::CacheHit);
        }

        #[test]
        fn regressed_cursor_is_cache_hit() {
            let cache = cached(AccountId::new(), Some(1), Some(10), Vec::new());
            assert_eq!(plan_fetch(Some(&cache), status(1, 4)), FetchPlan::CacheHit);
        }
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn new_entries_extend_existing() {
            let existing = vec![summary(1, ""), summary(2, "")];
            let fetched = vec![summary(3, ""), summary(4, "")];

            let merged = merge_summaries(&existing, fetched);
            let uids: Vec<u32> = merged.iter().map(|s| s.uid).collect();
            assert_eq!(uids, vec![1, 2, 3, 4]);
        }

        #[test]
        fn refetched_uid_replaces_cached_entry() {
            let existing = vec![summary(5, "")];
            let mut replacement = summary(5, "");
            replacement.subject = "Updated".to_string();

            let merged = merge_summaries(&existing, vec![replacement]);
            assert_eq!(merged.len(), 1);
            assert_eq!(merged[0].subject, "Updated");
        }

        #[test]
        fn merge_with_empty_fetch_is_identity() {
            let existing = vec![summary(2, ""), summary(7, "")];
            let merged = merge_summaries(&existing, Vec::new());
            assert_eq!(merged, existing);
        }

        #[test]
        fn merging_the_same_set_twice_is_idempotent() {
            let existing = vec![summary(1, ""), summary(2, "")];
            let fetched = vec![summary(2, ""), summary(3, "")];

            let once = merge_summaries(&existing, fetched.clone());
            let twice = merge_summaries(&once, fetched);
            assert_eq!(once, twice);
        }
    }

    mod sort_tests {
        use super::*;

        #[test]
        fn newest_dates_come_first() {
            let mut summaries = vec![
                summary(1, "Mon, 01 Jan 2024 10:00:00 +0000"),
                summary(2, "Wed, 03 Jan 2024 10:00:00 +0000"),
                summary(3, "Tue, 02 Jan 2024 10:00:00 +0000"),
            ];
            sort_newest_first(&mut summaries);
            let uids: Vec<u32> = summaries.iter().map(|s| s.uid).collect();
            assert_eq!(uids, vec![2, 3, 1]);
        }

        #[test]
        fn undated_entries_sort_last() {
            let mut summaries = vec![
                summary(9, ""),
                summary(1, "Mon, 01 Jan 2024 10:00:00 +0000"),
                summary(4, ""),
            ];
            sort_newest_first(&mut summaries);
            let uids: Vec<u32> = summaries.iter().map(|s| s.uid).collect();
            assert_eq!(uids, vec![1, 9, 4]);
        }

        #[test]
        fn equal_dates_break_by_uid_descending() {
            let mut summaries = vec![
                summary(3, "Mon, 01 Jan 2024 10:00:00 +0000"),
                summary(8, "Mon, 01 Jan 2024 10:00:00 +0000"),
            ];
            sort_newest_first(&mut summaries);
            let uids: Vec<u32> = summaries.iter().map(|s| s.uid).collect();
            assert_eq!(uids, vec![8, 3]);
        }
    }

    mod refresh_tests {
        use super::*;

        #[tokio::test]
        async fn full_fetch_populates_empty_cache() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();
            let observer = CollectingObserver::new();

            let mut session = ScriptedSession::new().status(status(7, 6)).uids(vec![3, 1, 5]);
            for n in [1, 3, 5] {
                session = session.summary(summary(n, ""));
            }
            let log = session.log();

            let result = refresh_mailbox(
                &mut session,
                &store,
                &observer,
                account_id,
                "INBOX",
                true,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await
            .unwrap();

            let uids: Vec<u32> = result.iter().map(|s| s.uid).collect();
            assert_eq!(uids, vec![5, 3, 1]);

            // UIDs are fetched in ascending order regardless of search order.
            assert_eq!(
                log.snapshot(),
                vec![
                    Call::Status {
                        mailbox: "INBOX".to_string()
                    },
                    Call::SearchAll {
                        mailbox: "INBOX".to_string()
                    },
                    Call::Fetch {
                        mailbox: "INBOX".to_string(),
                        uids: vec![1, 3, 5],
                    },
                ]
            );

            let saved = store.load(account_id, "INBOX").await.unwrap().unwrap();
            assert_eq!(saved.uid_validity, Some(7));
            assert_eq!(saved.uid_next, Some(6));
            assert_eq!(saved.summaries.len(), 3);

            // No cache existed, so nothing was seeded.
            assert!(observer.events().is_empty());
        }

        #[tokio::test]
        async fn full_fetch_keeps_only_newest_uids() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();

            let mut session = ScriptedSession::new()
                .status(status(1, 7))
                .uids(vec![1, 2, 3, 4, 5, 6]);
            for n in 1..=6 {
                session = session.summary(summary(n, ""));
            }
            let log = session.log();

            let result = refresh_mailbox(
                &mut session,
                &store,
                &NoopObserver,
                account_id,
                "INBOX",
                true,
                2,
            )
            .await
            .unwrap();

            let uids: Vec<u32> = result.iter().map(|s| s.uid).collect();
            assert_eq!(uids, vec![6, 5]);
            assert!(log.snapshot().contains(&Call::Fetch {
                mailbox: "INBOX".to_string(),
                uids: vec![5, 6],
            }));
        }

        #[tokio::test]
        async fn incremental_fetch_merges_new_messages() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();

            let existing: Vec<MessageSummary> = (1..=9).map(|n| summary(n, "")).collect();
            store
                .save(&cached(account_id, Some(1), Some(10), existing))
                .await
                .unwrap();

            let mut session = ScriptedSession::new()
                .status(status(1, 13))
                .uids(vec![10, 11, 12]);
            for n in [10, 11, 12] {
                session = session.summary(summary(n, ""));
            }
            let log = session.log();

            let result = refresh_mailbox(
                &mut session,
                &store,
                &NoopObserver,
                account_id,
                "INBOX",
                false,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await
            .unwrap();

            assert_eq!(result.len(), 12);
            let uids: Vec<u32> = result.iter().map(|s| s.uid).collect();
            assert_eq!(uids, (1..=12).rev().collect::<Vec<u32>>());

            assert_eq!(
                log.snapshot(),
                vec![
                    Call::Status {
                        mailbox: "INBOX".to_string()
                    },
                    Call::SearchRange {
                        mailbox: "INBOX".to_string(),
                        start: 10,
                        end: Some(12),
                    },
                    Call::Fetch {
                        mailbox: "INBOX".to_string(),
                        uids: vec![10, 11, 12],
                    },
                ]
            );

            let saved = store.load(account_id, "INBOX").await.unwrap().unwrap();
            assert_eq!(saved.uid_next, Some(13));
        }

        #[tokio::test]
        async fn cache_hit_issues_no_search() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();

            store
                .save(&cached(
                    account_id,
                    Some(1),
                    Some(10),
                    vec![summary(9, ""), summary(4, "")],
                ))
                .await
                .unwrap();

            let mut session = ScriptedSession::new().status(status(1, 10));
            let log = session.log();

            let result = refresh_mailbox(
                &mut session,
                &store,
                &NoopObserver,
                account_id,
                "INBOX",
                false,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await
            .unwrap();

            assert_eq!(result.len(), 2);
            assert_eq!(
                log.snapshot(),
                vec![Call::Status {
                    mailbox: "INBOX".to_string()
                }]
            );
        }

        #[tokio::test]
        async fn uid_validity_change_purges_cache() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();
            let observer = CollectingObserver::new();

            store
                .save(&cached(
                    account_id,
                    Some(1),
                    Some(10),
                    vec![summary(9, ""), summary(4, "")],
                ))
                .await
                .unwrap();

            let mut session = ScriptedSession::new().status(status(2, 3)).uids(vec![1, 2]);
            for n in [1, 2] {
                session = session.summary(summary(n, ""));
            }

            let result = refresh_mailbox(
                &mut session,
                &store,
                &observer,
                account_id,
                "INBOX",
                false,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await
            .unwrap();

            // Nothing from the stale generation survives.
            let uids: Vec<u32> = result.iter().map(|s| s.uid).collect();
            assert_eq!(uids, vec![2, 1]);

            assert_eq!(
                observer.events(),
                vec![SyncEvent::Invalidated {
                    account_id,
                    mailbox: "INBOX".to_string()
                }]
            );

            let saved = store.load(account_id, "INBOX").await.unwrap().unwrap();
            assert_eq!(saved.uid_validity, Some(2));
            assert_eq!(saved.uid_next, Some(3));
            assert_eq!(saved.summaries.len(), 2);
        }

        #[tokio::test]
        async fn seeds_only_when_view_is_empty() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();

            store
                .save(&cached(account_id, Some(1), Some(10), vec![summary(9, "")]))
                .await
                .unwrap();

            let observer = CollectingObserver::new();
            let mut session = ScriptedSession::new().status(status(1, 10));
            refresh_mailbox(
                &mut session,
                &store,
                &observer,
                account_id,
                "INBOX",
                false,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await
            .unwrap();
            assert!(observer.events().is_empty());

            let observer = CollectingObserver::new();
            let mut session = ScriptedSession::new().status(status(1, 10));
            refresh_mailbox(
                &mut session,
                &store,
                &observer,
                account_id,
                "INBOX",
                true,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await
            .unwrap();
            assert_eq!(
                observer.events(),
                vec![SyncEvent::Seeded {
                    account_id,
                    mailbox: "INBOX".to_string(),
                    count: 1,
                }]
            );
        }

        #[tokio::test]
        async fn omitted_server_counters_are_carried_forward() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();

            store
                .save(&cached(account_id, Some(5), Some(10), vec![summary(9, "")]))
                .await
                .unwrap();

            // Server reports neither counter; the open-ended search finds
            // nothing new.
            let mut session = ScriptedSession::new().status(status(0, 0));
            let log = session.log();

            refresh_mailbox(
                &mut session,
                &store,
                &NoopObserver,
                account_id,
                "INBOX",
                false,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await
            .unwrap();

            assert!(log.snapshot().contains(&Call::SearchRange {
                mailbox: "INBOX".to_string(),
                start: 10,
                end: None,
            }));

            let saved = store.load(account_id, "INBOX").await.unwrap().unwrap();
            assert_eq!(saved.uid_validity, Some(5));
            assert_eq!(saved.uid_next, Some(10));
        }

        #[tokio::test]
        async fn failed_status_leaves_cache_untouched() {
            let store = CacheRepository::in_memory().await.unwrap();
            let account_id = AccountId::new();

            let original = cached(account_id, Some(1), Some(10), vec![summary(9, "")]);
            store.save(&original).await.unwrap();

            let mut session = ScriptedSession::new().fail_status();
            let result = refresh_mailbox(
                &mut session,
                &store,
                &NoopObserver,
                account_id,
                "INBOX",
                false,
                DEFAULT_SUMMARY_LIMIT,
            )
            .await;
            assert!(result.is_err());

            let saved = store.load(account_id, "INBOX").await.unwrap().unwrap();
            assert_eq!(saved.uid_validity, Some(1));
            assert_eq!(saved.uid_next, Some(10));
            assert_eq!(saved.summaries.len(), 1);
        }
    }
}
