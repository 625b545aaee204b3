//! Networked services: sessions, sync and mutations.
//!
//! [`Mailer`] is the entry point. It owns the data directory, the settings,
//! the event sink and one [`AccountSession`] per signed-in account.

mod connector;
mod mailer;
mod mutation;
mod session;
mod sync;

pub use connector::{Connector, TlsConnector};
pub use mailer::Mailer;
pub use session::{AccountSession, SessionGuard, SharedIndex};
