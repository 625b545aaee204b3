//! Bracketed response codes.

use super::{Capability, Flag, Uid, UidValidity};

/// Response code carried in `[...]` by a condition response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT
    Alert,
    /// CAPABILITY list, often attached to the greeting or to a login OK.
    Capability(Vec<Capability>),
    /// PERMANENTFLAGS
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY
    ReadOnly,
    /// READ-WRITE
    ReadWrite,
    /// TRYCREATE: the target mailbox of COPY/MOVE does not exist.
    TryCreate,
    /// UIDNEXT
    UidNext(Uid),
    /// UIDVALIDITY
    UidValidity(UidValidity),
    /// Any other code; only its name is kept.
    Other(String),
}
