//! Error types for the IMAP client.

use std::time::Duration;

use thiserror::Error;

use crate::sasl::OAuthError;

/// Errors that can occur while talking to an IMAP server.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or record error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name not usable as a TLS server name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response bytes did not match the IMAP grammar.
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte offset within the response line.
        position: usize,
        /// What was expected.
        message: String,
    },

    /// XOAUTH2 was refused with a structured error challenge.
    #[error("XOAUTH2 rejected: status {}, schemes {}", .0.status, .0.schemes)]
    OAuth(OAuthError),

    /// Authentication was refused without a structured challenge.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server answered NO.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server answered BAD.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE and is closing the connection.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// No bytes arrived within the idle timeout.
    #[error("Read timed out after {0:?}")]
    Timeout(Duration),

    /// Command issued in a connection state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unexpected data or a violated protocol limit.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true if the failure came from the transport rather than the
    /// server's answer to a command.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) | Self::Timeout(_) | Self::Bye(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
