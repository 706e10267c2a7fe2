//! # mailvane-core
//!
//! Core logic for the Mailvane mail client.
//!
//! This crate provides:
//! - Account management with keyring-backed passwords
//! - Persistent mailbox cache (`SQLite`) for instant startup
//! - Incremental UID-based mailbox synchronization
//! - A multi-account mail service that keeps one session per account
//!   and discards refresh results that arrive after an account switch

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod cache;
mod error;
pub mod service;
pub mod sync;

pub use account::credentials;
pub use account::{Account, AccountId, AccountRepository, Security};
pub use cache::{CacheRepository, MailboxCache, MessageSummary};
pub use error::{Error, Result};
pub use service::{INBOX, ImapSessionFactory, MailService, MailSession, MailboxOps, SessionFactory};
pub use sync::{
    CollectingObserver, DEFAULT_SUMMARY_LIMIT, FetchPlan, MailboxView, NoopObserver, SyncEvent,
    SyncObserver, plan_fetch, refresh_mailbox,
};
