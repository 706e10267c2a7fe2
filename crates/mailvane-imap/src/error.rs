//! Error types for the IMAP library.

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Peer closed the connection before a complete response arrived.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Tagged completion was not `OK`.
    #[error("Command failed: {line}")]
    CommandFailed {
        /// The raw tagged response line, including the status word.
        line: String,
    },

    /// Response did not have the shape the operation requires.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Protocol parsing error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The requested security mode is not supported by this client.
    #[error("Unsupported security mode: {0}")]
    UnsupportedSecurity(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
