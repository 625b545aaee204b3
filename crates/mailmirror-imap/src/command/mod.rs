//! IMAP command builder.
//!
//! Only the commands a mirroring client issues are modelled. Every
//! message-addressing command uses UIDs, never sequence numbers.

mod serialize;
mod tag_generator;
mod types;

use crate::types::UidSet;

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, SearchCriteria, StoreAction};

use serialize::{write_astring, write_fetch_attributes, write_search_criteria, write_store_action};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// LOGOUT command.
    Logout,
    /// AUTHENTICATE command.
    Authenticate {
        /// SASL mechanism name.
        mechanism: String,
        /// Initial client response (SASL-IR), already base64 encoded.
        initial_response: Option<String>,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
        /// Append `RETURN (CHILDREN)` (LIST-EXTENDED servers only).
        return_children: bool,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// EXPUNGE command.
    Expunge,
    /// UID EXPUNGE command (RFC 4315).
    UidExpunge {
        /// UIDs to expunge.
        uids: UidSet,
    },
    /// UID SEARCH command.
    UidSearch {
        /// Search key.
        criteria: SearchCriteria,
    },
    /// UID FETCH command.
    UidFetch {
        /// UIDs to fetch.
        uids: UidSet,
        /// Data items to return.
        attributes: Vec<FetchAttribute>,
    },
    /// UID STORE command.
    UidStore {
        /// UIDs to change.
        uids: UidSet,
        /// Flag change.
        action: StoreAction,
        /// Suppress the untagged FETCH echo.
        silent: bool,
    },
    /// UID COPY command.
    UidCopy {
        /// UIDs to copy.
        uids: UidSet,
        /// Target mailbox.
        mailbox: String,
    },
    /// UID MOVE command (RFC 6851).
    UidMove {
        /// UIDs to move.
        uids: UidSet,
        /// Target mailbox.
        mailbox: String,
    },
}

impl Command {
    /// Serializes the command with the given tag, including the final CRLF.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Expunge => buf.extend_from_slice(b"EXPUNGE"),

            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTHENTICATE ");
                buf.extend_from_slice(mechanism.as_bytes());
                if let Some(resp) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(resp.as_bytes());
                }
            }

            Self::List {
                reference,
                pattern,
                return_children,
            } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_astring(&mut buf, pattern);
                if *return_children {
                    buf.extend_from_slice(b" RETURN (CHILDREN)");
                }
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox);
            }

            Self::UidExpunge { uids } => {
                buf.extend_from_slice(b"UID EXPUNGE ");
                buf.extend_from_slice(uids.to_string().as_bytes());
            }

            Self::UidSearch { criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                write_search_criteria(&mut buf, criteria);
            }

            Self::UidFetch { uids, attributes } => {
                buf.extend_from_slice(b"UID FETCH ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_attributes(&mut buf, attributes);
            }

            Self::UidStore {
                uids,
                action,
                silent,
            } => {
                buf.extend_from_slice(b"UID STORE ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_store_action(&mut buf, action, *silent);
            }

            Self::UidCopy { uids, mailbox } => {
                buf.extend_from_slice(b"UID COPY ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
            }

            Self::UidMove { uids, mailbox } => {
                buf.extend_from_slice(b"UID MOVE ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Short name for log lines. Never includes credentials.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Logout => "LOGOUT",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::List { .. } => "LIST",
            Self::Select { .. } => "SELECT",
            Self::Expunge => "EXPUNGE",
            Self::UidExpunge { .. } => "UID EXPUNGE",
            Self::UidSearch { .. } => "UID SEARCH",
            Self::UidFetch { .. } => "UID FETCH",
            Self::UidStore { .. } => "UID STORE",
            Self::UidCopy { .. } => "UID COPY",
            Self::UidMove { .. } => "UID MOVE",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Flag;

    fn render(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize("A0001")).unwrap()
    }

    #[test]
    fn list_all_quotes_arguments() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".into(),
            return_children: false,
        };
        assert_eq!(render(&cmd), "A0001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn list_extended_return_children() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".into(),
            return_children: true,
        };
        assert_eq!(render(&cmd), "A0001 LIST \"\" \"*\" RETURN (CHILDREN)\r\n");
    }

    #[test]
    fn select_quotes_names_with_spaces() {
        let plain = Command::Select {
            mailbox: "INBOX".into(),
        };
        assert_eq!(render(&plain), "A0001 SELECT INBOX\r\n");

        let spaced = Command::Select {
            mailbox: "[Gmail]/All Mail".into(),
        };
        assert_eq!(render(&spaced), "A0001 SELECT \"[Gmail]/All Mail\"\r\n");
    }

    #[test]
    fn uid_search_delta() {
        let known = UidSet::from_uids([12, 13, 17]).unwrap();
        let cmd = Command::UidSearch {
            criteria: SearchCriteria::not_uids(known),
        };
        assert_eq!(render(&cmd), "A0001 UID SEARCH NOT UID 12,13,17\r\n");

        let all = Command::UidSearch {
            criteria: SearchCriteria::All,
        };
        assert_eq!(render(&all), "A0001 UID SEARCH ALL\r\n");
    }

    #[test]
    fn uid_fetch_mirror_items() {
        let cmd = Command::UidFetch {
            uids: UidSet::from_uids([12, 13, 17]).unwrap(),
            attributes: FetchAttribute::mirror(),
        };
        assert_eq!(
            render(&cmd),
            "A0001 UID FETCH 12,13,17 (ENVELOPE UID BODY.PEEK[HEADER] BODY.PEEK[TEXT])\r\n"
        );
    }

    #[test]
    fn uid_store_silent() {
        let add = Command::UidStore {
            uids: UidSet::from_uids([12]).unwrap(),
            action: StoreAction::Add(vec![Flag::Seen]),
            silent: true,
        };
        assert_eq!(render(&add), "A0001 UID STORE 12 +FLAGS.SILENT (\\Seen)\r\n");

        let remove = Command::UidStore {
            uids: UidSet::from_uids([12]).unwrap(),
            action: StoreAction::Remove(vec![Flag::Flagged]),
            silent: false,
        };
        assert_eq!(render(&remove), "A0001 UID STORE 12 -FLAGS (\\Flagged)\r\n");
    }

    #[test]
    fn move_copy_expunge() {
        let set = UidSet::from_uids([17]).unwrap();
        assert_eq!(
            render(&Command::UidMove {
                uids: set.clone(),
                mailbox: "Archive".into()
            }),
            "A0001 UID MOVE 17 Archive\r\n"
        );
        assert_eq!(
            render(&Command::UidCopy {
                uids: set.clone(),
                mailbox: "Archive".into()
            }),
            "A0001 UID COPY 17 Archive\r\n"
        );
        assert_eq!(
            render(&Command::UidExpunge { uids: set }),
            "A0001 UID EXPUNGE 17\r\n"
        );
        assert_eq!(render(&Command::Expunge), "A0001 EXPUNGE\r\n");
    }

    #[test]
    fn authenticate_with_initial_response() {
        let cmd = Command::Authenticate {
            mechanism: "XOAUTH2".into(),
            initial_response: Some("dXNlcg==".into()),
        };
        assert_eq!(render(&cmd), "A0001 AUTHENTICATE XOAUTH2 dXNlcg==\r\n");
        assert_eq!(cmd.name(), "AUTHENTICATE");
    }
}
