//! Cache data models.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A mailbox address. Two addresses are equal when their `address` is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    /// Display name, empty when absent.
    #[serde(default)]
    pub name: String,
    /// `local@domain`.
    pub address: String,
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl Address {
    /// Creates an address.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Summary metadata of a message, as delivered by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    /// Date header, unparsed.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

impl Envelope {
    /// Parses the `Date` header as RFC 2822.
    ///
    /// A trailing comment such as `(UTC)` is tolerated.
    #[must_use]
    pub fn parsed_date(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.date.as_deref()?.trim();
        if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
            return Some(date);
        }
        let without_comment = raw.rsplit_once(" (").map(|(head, _)| head)?;
        DateTime::parse_from_rfc2822(without_comment.trim()).ok()
    }
}

fn convert_addresses(addresses: Vec<mailmirror_imap::Address>) -> Vec<Address> {
    addresses
        .into_iter()
        .filter_map(|addr| {
            let address = addr.email()?;
            Some(Address {
                name: addr.name.unwrap_or_default(),
                address,
            })
        })
        .collect()
}

impl From<mailmirror_imap::Envelope> for Envelope {
    fn from(env: mailmirror_imap::Envelope) -> Self {
        Self {
            date: env.date,
            subject: env.subject,
            from: convert_addresses(env.from),
            sender: convert_addresses(env.sender),
            reply_to: convert_addresses(env.reply_to),
            to: convert_addresses(env.to),
            cc: convert_addresses(env.cc),
            bcc: convert_addresses(env.bcc),
            in_reply_to: env.in_reply_to,
            message_id: env.message_id,
        }
    }
}

/// One message known to the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheData {
    /// Envelope from the server.
    pub envelope: Envelope,
    /// Server UID, unique within the mailbox's UIDVALIDITY epoch.
    pub uid: u32,
    /// Maildir base key, without flag suffix.
    pub filename: String,
    /// Flags such as `\Seen`; omitted from JSON when empty.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<String>,
}

impl CacheData {
    /// Creates an entry with no flags.
    pub fn new(envelope: Envelope, uid: u32, filename: impl Into<String>) -> Self {
        Self {
            envelope,
            uid,
            filename: filename.into(),
            flags: BTreeSet::new(),
        }
    }

    /// True if `\Seen` is set.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.flags.contains("\\Seen")
    }

    /// True if `\Flagged` is set.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flags.contains("\\Flagged")
    }
}
