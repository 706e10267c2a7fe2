//! Incremental mailbox synchronization.
//!
//! The engine turns cached sync counters and a server `STATUS` into the
//! cheapest fetch that brings the cache current; the observer reports
//! lifecycle events; the view holds what a frontend renders.

pub mod engine;
mod observer;
mod view;

pub use engine::{DEFAULT_SUMMARY_LIMIT, FetchPlan, plan_fetch, refresh_mailbox};
pub use observer::{CollectingObserver, NoopObserver, SyncEvent, SyncObserver};
pub use view::MailboxView;
