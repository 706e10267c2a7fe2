//! # mailvane-imap
//!
//! An async IMAP client library covering the subset of RFC 3501
//! (`IMAP4rev1`) needed for incremental mailbox synchronization: LOGIN,
//! SELECT, STATUS, LIST, UID SEARCH, and UID FETCH with literal-aware
//! response framing.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   IMAP state transitions (`NotAuthenticated` → `Authenticated` → `Selected`)
//! - **Literal-aware framing**: `{n}` octet literals are consumed exactly,
//!   so header blocks and body excerpts survive embedded CRLFs
//! - **UID-based fetch**: search results and fetched messages are keyed by
//!   UID, never by response position
//! - **TLS via rustls**: Secure connections without OpenSSL dependency
//! - **Idempotent sessions**: [`connection::Session`] wraps the type-state
//!   client behind connect/login/select calls that skip work already done
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailvane_imap::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> mailvane_imap::Result<()> {
//!     // Connect with implicit TLS
//!     let config = Config::new("imap.example.com");
//!     let stream = mailvane_imap::connection::connect(&config).await?;
//!     let client = Client::from_stream(stream).await?;
//!
//!     // Authenticate
//!     let client = client.login("user@example.com", "password").await?;
//!
//!     // Select INBOX and find what is there
//!     let mut client = client.select("INBOX").await?;
//!     let uids = client.uid_search_all().await?;
//!
//!     // Fetch headers and a short body excerpt for the newest few
//!     let recent: Vec<_> = uids.iter().rev().take(10).rev().copied().collect();
//!     let messages = client.fetch_headers_with_preview(&recent).await?;
//!     for message in &messages {
//!         println!("UID {}: {} header bytes", message.uid, message.headers.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! The library uses the type-state pattern to enforce valid IMAP operations
//! at compile time:
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select() ───→ Selected
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      Selected       │ ─── select() ───→ Selected (switch mailbox)
//! └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and tag generation
//! - [`connection`]: Connection management, type-state client, and sessions
//! - [`fetch`]: Fetched-message assembly from framed responses
//! - [`types`]: Core IMAP types (UIDs, mailbox status)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod fetch;
mod parser;
pub mod types;

pub use command::{Command, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, ImapStream, NotAuthenticated,
    ResponseAccumulator, ResponsePart, Security, Selected, Session, SessionConfig,
};
pub use error::{Error, Result};
pub use fetch::FetchedMessage;
pub use types::{MailboxStatus, Uid, UidValidity};

/// IMAP protocol revision this client targets.
pub const IMAP_VERSION: &str = "IMAP4rev1";
