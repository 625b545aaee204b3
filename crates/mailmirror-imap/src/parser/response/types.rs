//! Response data types.

use crate::types::{Capability, Flags, ListResponse, ResponseCode, SeqNum, Uid};

/// One data item of an untagged FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// FLAGS
    Flags(Flags),
    /// UID
    Uid(Uid),
    /// ENVELOPE
    Envelope(Box<Envelope>),
    /// `BODY[section]<origin>`
    Body {
        /// Section specifier such as `HEADER` or `TEXT`; `None` for the
        /// whole message.
        section: Option<String>,
        /// Partial-fetch origin.
        origin: Option<u32>,
        /// Section bytes, `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
}

/// Message envelope as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
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

/// Envelope address structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain part.
    pub host: Option<String>,
}

impl Address {
    /// `mailbox@host`, or `None` for group markers and incomplete addresses.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`
    Ok {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* NO`
    No {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* PREAUTH`
    PreAuth {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BYE`
    Bye {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY`
    Capability(Vec<Capability>),
    /// `* LIST`
    List(ListResponse),
    /// `* FLAGS`
    Flags(Flags),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchItem>,
    },
    /// `* SEARCH`; the numbers are UIDs when answering UID SEARCH.
    Search(Vec<u32>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_email() {
        let full = Address {
            name: Some("Ann".into()),
            adl: None,
            mailbox: Some("ann".into()),
            host: Some("example.com".into()),
        };
        assert_eq!(full.email().as_deref(), Some("ann@example.com"));

        let group_end = Address {
            name: None,
            adl: None,
            mailbox: None,
            host: None,
        };
        assert_eq!(group_end.email(), None);
    }
}
