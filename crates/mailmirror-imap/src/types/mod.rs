//! Core IMAP types.
//!
//! Identifiers, flags, capabilities and mailbox metadata as defined by
//! RFC 3501, plus the MOVE (RFC 6851), UIDPLUS (RFC 4315) and
//! LIST-EXTENDED (RFC 5258) capabilities the mirror probes for.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod uid_set;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, MailboxAttribute, MailboxStatus};
pub use response_code::ResponseCode;
pub use uid_set::UidSet;
