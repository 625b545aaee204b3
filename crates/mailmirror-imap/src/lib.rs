//! # mailmirror-imap
//!
//! A small async IMAP4rev1 client (RFC 3501) covering exactly what an
//! offline mirror needs: XOAUTH2 sign-in over implicit TLS, mailbox
//! discovery, UID delta search, streaming UID FETCH of envelopes and bodies,
//! silent flag stores and MOVE (with a COPY/EXPUNGE fallback).
//!
//! ## Layout
//!
//! - [`command`]: command serialization and tag generation
//! - [`connection`]: TLS dialing, CRLF/literal framing, and the [`Client`]
//! - [`parser`]: sans-I/O lexer and response parser
//! - [`sasl`]: XOAUTH2 initial response and server error challenges
//! - [`types`]: UIDs, flags, capabilities, mailbox metadata
//!
//! ## Example
//!
//! ```ignore
//! use mailmirror_imap::{Client, Config, FetchAttribute, SearchCriteria, UidSet};
//!
//! let config = Config::new("imap.gmail.com");
//! let stream = mailmirror_imap::connection::connect_tls(&config).await?;
//! let mut client = Client::from_stream(stream, &config).await?;
//! client.authenticate_xoauth2("me@gmail.com", &access_token).await?;
//!
//! client.select("INBOX").await?;
//! let uids = client.uid_search(&SearchCriteria::All).await?;
//! if let Some(set) = UidSet::from_uids(uids) {
//!     let mut fetch = client.uid_fetch(&set, &FetchAttribute::mirror()).await?;
//!     while let Some(message) = fetch.next().await? {
//!         println!("{} {:?}", message.uid, message.envelope.subject);
//!     }
//! }
//! client.logout().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod sasl;
pub mod types;

pub use command::{Command, FetchAttribute, SearchCriteria, StoreAction, TagGenerator};
pub use connection::{Client, Config, FetchStream, FetchedMessage, FramedStream, ImapStream};
pub use error::{Error, Result};
pub use parser::{Address, Envelope, Response, ResponseParser, UntaggedResponse};
pub use sasl::OAuthError;
pub use types::{
    Capability, Flag, Flags, ListResponse, MailboxAttribute, MailboxStatus, ResponseCode, SeqNum,
    Status, Tag, Uid, UidSet, UidValidity,
};
