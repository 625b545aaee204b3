//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket, TLS, timeout or server disconnect.
    #[error("Network error: {0}")]
    Network(#[source] mailmirror_imap::Error),

    /// The server rejected the bearer token with a structured challenge.
    #[error("Authentication rejected: status {status}, schemes {schemes}")]
    AuthChallenge {
        /// HTTP-like status, e.g. `"401"`.
        status: String,
        /// Accepted schemes.
        schemes: String,
        /// Required scope, when named.
        scope: Option<String>,
    },

    /// Authentication failed for another reason: no token, an expired
    /// token, or a plain NO to AUTHENTICATE.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Unexpected server answer or missing capability.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file exists but cannot be interpreted.
    #[error("Corrupt file {}: {message}", path.display())]
    Corruption {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// No maildir file for a key.
    #[error("No message file for key {0}")]
    NotFound(String),

    /// The index has no entry for a UID.
    #[error("UID {uid} is not cached in {mailbox}")]
    UnknownMessage {
        /// Mailbox searched.
        mailbox: String,
        /// Missing UID.
        uid: u32,
    },

    /// The server renumbered a mailbox since it was mirrored; cached UIDs
    /// may now name other messages.
    #[error("UIDVALIDITY of {mailbox} changed from {stored} to {current}")]
    UidValidityChanged {
        /// Mailbox name.
        mailbox: String,
        /// Value the mirror was built under.
        stored: u32,
        /// Value the server reports now.
        current: u32,
    },

    /// The account's session was closed.
    #[error("Session for {0} is closed")]
    SessionClosed(String),

    /// A path token is not valid unpadded base32 of UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`], carried by events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport failure; the account task is abandoned.
    Network,
    /// Token missing, expired or rejected.
    Auth,
    /// Server answer the mirror cannot use; the mailbox is skipped.
    Protocol,
    /// Local filesystem failure.
    Io,
    /// Unreadable local file.
    Corruption,
    /// Missing message or index entry.
    NotFound,
    /// Bad path token.
    Encoding,
    /// Bad configuration.
    Config,
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::SessionClosed(_) => ErrorKind::Network,
            Self::AuthChallenge { .. } | Self::Auth(_) => ErrorKind::Auth,
            Self::Protocol(_) | Self::UidValidityChanged { .. } => ErrorKind::Protocol,
            Self::Io(_) => ErrorKind::Io,
            Self::Corruption { .. } => ErrorKind::Corruption,
            Self::NotFound(_) | Self::UnknownMessage { .. } => ErrorKind::NotFound,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// True for errors that end an account's sync run rather than a single
    /// mailbox.
    #[must_use]
    pub const fn is_fatal_for_account(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Auth)
    }
}

impl From<mailmirror_imap::Error> for Error {
    fn from(err: mailmirror_imap::Error) -> Self {
        use mailmirror_imap::Error as Imap;

        if err.is_transport() {
            return Self::Network(err);
        }
        match err {
            Imap::OAuth(challenge) => Self::AuthChallenge {
                status: challenge.status,
                schemes: challenge.schemes,
                scope: challenge.scope,
            },
            Imap::Auth(text) => Self::Auth(text),
            Imap::No(text) => Self::Protocol(format!("server said NO: {text}")),
            Imap::Bad(text) => Self::Protocol(format!("server said BAD: {text}")),
            other => Self::Protocol(other.to_string()),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
