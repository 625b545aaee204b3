//! Connection handling: TLS dialing, framing, and the client.

mod client;
mod config;
mod fetch_stream;
mod framed;
mod stream;

pub use client::Client;
pub use config::{Config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, IMAPS_PORT};
pub use fetch_stream::{FetchStream, FetchedMessage};
pub use framed::{FramedStream, MAX_LITERAL_SIZE, MAX_LINE_LENGTH, is_tagged};
pub use stream::{ImapStream, connect_tls, create_tls_connector};
