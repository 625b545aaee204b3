//! # mailmirror-core
//!
//! Offline-first mirror of IMAP accounts.
//!
//! Every selectable mailbox of every configured account is copied into a
//! local maildir, and a small JSON index of envelopes per mailbox is kept
//! next to it for display. Syncs are incremental: only UIDs missing from
//! the index are fetched.
//!
//! This crate provides:
//! - [`encoding`]: base32 path tokens for account and mailbox names
//! - [`maildir`]: the `tmp/`, `new/`, `cur/` message store
//! - [`cache`]: the per-mailbox message index
//! - [`account`]: settings, providers and OAuth token files
//! - [`service`]: account sessions, the sync engine and mutations
//!
//! ## On-disk layout
//!
//! ```text
//! <data dir>/
//!   mail/<base32(email)>/<base32(mailbox)>/{tmp,new,cur}/
//!   caching/<base32(email)>/<base32(mailbox)>/cached-messages.json
//!   caching/<base32(email)>/<base32(mailbox)>/uid-validity
//!   caching/<base32(email)>/<base32(mailbox)>/skipped-uids.json
//!   auth/<base32(email)>/<provider>-token.json
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod cache;
pub mod encoding;
mod error;
pub mod events;
mod fs;
pub mod layout;
pub mod maildir;
pub mod service;

pub use account::{AccountConfig, Provider, Settings, Token, load_token, save_token};
pub use cache::{Address, CacheData, CacheIndex, Envelope};
pub use error::{Error, ErrorKind, Result};
pub use events::{EventSink, SyncEvent};
pub use layout::DataDir;
pub use maildir::{Maildir, MaildirWriter};
pub use service::{
    AccountSession, Connector, Mailer, SessionGuard, SharedIndex, TlsConnector,
};
