//! Response status and server capabilities.

/// Status word of a tagged or untagged condition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// OK
    Ok,
    /// NO: the command failed.
    No,
    /// BAD: the command was malformed.
    Bad,
    /// PREAUTH greeting.
    PreAuth,
    /// BYE: the server is closing the connection.
    Bye,
}

impl Status {
    /// Returns true for OK and PREAUTH.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// A capability advertised by the server.
///
/// Only the capabilities the mirror acts on get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1`
    Imap4Rev1,
    /// MOVE (RFC 6851)
    Move,
    /// UIDPLUS (RFC 4315): enables `UID EXPUNGE`.
    UidPlus,
    /// LIST-EXTENDED (RFC 5258)
    ListExtended,
    /// `AUTH=<mechanism>`
    Auth(String),
    /// Anything else, verbatim.
    Other(String),
}

impl Capability {
    /// Parses a capability atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "MOVE" => Self::Move,
            "UIDPLUS" => Self::UidPlus,
            "LIST-EXTENDED" => Self::ListExtended,
            _ => upper
                .strip_prefix("AUTH=")
                .map_or_else(|| Self::Other(s.to_string()), |m| Self::Auth(m.to_string())),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => f.write_str("IMAP4rev1"),
            Self::Move => f.write_str("MOVE"),
            Self::UidPlus => f.write_str("UIDPLUS"),
            Self::ListExtended => f.write_str("LIST-EXTENDED"),
            Self::Auth(mechanism) => write!(f, "AUTH={mechanism}"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
        assert!(!Status::Bye.is_ok());
    }

    #[test]
    fn parse_known() {
        assert_eq!(Capability::parse("imap4rev1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("MOVE"), Capability::Move);
        assert_eq!(Capability::parse("UIDPLUS"), Capability::UidPlus);
        assert_eq!(Capability::parse("LIST-EXTENDED"), Capability::ListExtended);
    }

    #[test]
    fn parse_auth_mechanism() {
        assert_eq!(
            Capability::parse("AUTH=XOAUTH2"),
            Capability::Auth("XOAUTH2".to_string())
        );
        assert_eq!(Capability::parse("AUTH=XOAUTH2").to_string(), "AUTH=XOAUTH2");
    }

    #[test]
    fn parse_other_keeps_spelling() {
        assert_eq!(
            Capability::parse("X-GM-EXT-1"),
            Capability::Other("X-GM-EXT-1".to_string())
        );
    }
}
