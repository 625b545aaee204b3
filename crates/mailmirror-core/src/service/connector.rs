//! How sessions obtain a byte stream to the server.

use std::future::Future;

use mailmirror_imap::{Config, ImapStream};
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens transport streams to IMAP servers.
///
/// Production code uses [`TlsConnector`]; tests plug in scripted streams.
pub trait Connector: Send + Sync + 'static {
    /// Stream type handed to the IMAP client.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connects to the server described by `config`.
    fn connect(
        &self,
        config: &Config,
    ) -> impl Future<Output = mailmirror_imap::Result<Self::Stream>> + Send;
}

/// Implicit TLS on port 993, verified against the webpki roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsConnector;

impl Connector for TlsConnector {
    type Stream = ImapStream;

    async fn connect(&self, config: &Config) -> mailmirror_imap::Result<Self::Stream> {
        mailmirror_imap::connection::connect_tls(config).await
    }
}
