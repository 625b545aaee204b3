//! TLS transport.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::Config;
use crate::{Error, Result};

/// A TLS connection to an IMAP server.
pub type ImapStream = TlsStream<TcpStream>;

/// Creates a TLS connector trusting the webpki root set.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Dials `host:port` and completes the TLS handshake.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if the handshake does not finish within
/// `connect_timeout`, or the underlying I/O, DNS-name or TLS error.
pub async fn connect_tls(config: &Config) -> Result<ImapStream> {
    let server_name = ServerName::try_from(config.host.clone())?;
    let connector = create_tls_connector();
    let addr = format!("{}:{}", config.host, config.port);

    bounded(config.connect_timeout, async {
        let tcp = TcpStream::connect(&addr).await?;
        tcp.set_nodelay(true)?;
        Ok(connector.connect(server_name, tcp).await?)
    })
    .await
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(limit))?
}
