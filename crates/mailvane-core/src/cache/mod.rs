//! Cached mailbox state for instant startup.
//!
//! Stores the last known summaries and sync counters per (account,
//! mailbox), so the view can show mail before the network answers and
//! the next refresh can fetch only what changed.

mod model;
mod repository;

pub use model::{MailboxCache, MessageSummary};
pub use repository::CacheRepository;
