//! # mailvane-mime
//!
//! Header and body-text decoding for mail clients.
//!
//! ## Features
//!
//! - **Header parsing**: Folded header blocks into lowercased field maps,
//!   with envelope extraction (`Subject`, `From`, `Date`)
//! - **Encoded words**: RFC 2047 `B` and `Q` decoding anywhere in a header
//!   value, with Latin-1 fallback for unknown charsets
//! - **Date parsing**: RFC 2822 dates plus the common degenerate variants
//! - **Previews**: Short plain-text previews from raw body excerpts, with
//!   HTML flattening and quoted-reply filtering
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailvane_mime::ParsedHeaders;
//! use mailvane_mime::preview::preview_text;
//!
//! let raw = b"Subject: =?utf-8?B?SMOpbGxv?=\r\n\
//!             From: alice@example.com\r\n\
//!             Date: Mon, 1 Jan 2024 09:00:00 +0000\r\n\r\n";
//!
//! let parsed = ParsedHeaders::parse(raw);
//! assert_eq!(parsed.subject, "Héllo");
//!
//! let preview = preview_text(Some(b"Hi,\r\n> old quote\r\nsee you"));
//! assert_eq!(preview.as_deref(), Some("Hi, see you"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;

pub mod date;
pub mod encoding;
pub mod preview;

pub use error::{Error, Result};
pub use header::{Headers, ParsedHeaders};
