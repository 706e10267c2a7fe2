//! Core services for mail operations.
//!
//! This module provides the service layer that bridges a frontend
//! with the underlying IMAP and MIME libraries.

pub mod mail;
mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use mail::{INBOX, MailService};
pub use session::{ImapSessionFactory, MailSession, MailboxOps, SessionFactory};
