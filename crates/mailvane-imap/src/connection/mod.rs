//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode)
//! - TLS/plaintext stream abstraction
//! - Framed I/O with literal-aware response accumulation
//! - Type-state connection wrapper
//! - High-level session with idempotent state transitions

mod client;
mod config;
mod framed;
mod session;
mod stream;

pub use client::{Authenticated, Client, NotAuthenticated, Selected};
pub use config::{Config, ConfigBuilder, Security};
pub use framed::{FramedStream, ResponseAccumulator, ResponsePart};
pub use session::{Session, SessionConfig};
pub use stream::{ImapStream, connect, connect_plain, connect_tls, create_tls_connector};
