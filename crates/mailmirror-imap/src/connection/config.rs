//! Connection configuration.

use std::time::Duration;

use super::framed::MAX_LITERAL_SIZE;

/// Port for IMAP over implicit TLS.
pub const IMAPS_PORT: u16 = 993;

/// Default bound on TCP connect plus TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a single read or write. A server that sends nothing
/// for this long is treated as gone.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// IMAP connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server hostname, also used for certificate verification.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connect and handshake timeout.
    pub connect_timeout: Duration,
    /// Per-operation read/write timeout.
    pub io_timeout: Duration,
    /// Literals above this many bytes are discarded rather than kept.
    pub max_literal_size: usize,
}

impl Config {
    /// Implicit TLS on port 993 with default timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: IMAPS_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            max_literal_size: MAX_LITERAL_SIZE,
        }
    }

    /// Overrides the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the per-operation timeout.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Overrides the literal size cap.
    #[must_use]
    pub const fn with_max_literal_size(mut self, max: usize) -> Self {
        self.max_literal_size = max;
        self
    }
}
