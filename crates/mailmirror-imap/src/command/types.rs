//! Arguments of the commands the client issues.

use crate::types::{Flag, UidSet};

/// Data item requested by `UID FETCH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// ENVELOPE
    Envelope,
    /// UID
    Uid,
    /// FLAGS
    Flags,
    /// `BODY.PEEK[section]`: reads the section without setting `\Seen`.
    BodyPeek(String),
}

impl FetchAttribute {
    /// Items needed to mirror a message: its envelope, its UID and the
    /// header and text sections, all fetched without touching `\Seen`.
    #[must_use]
    pub fn mirror() -> Vec<Self> {
        vec![
            Self::Envelope,
            Self::Uid,
            Self::BodyPeek("HEADER".to_string()),
            Self::BodyPeek("TEXT".to_string()),
        ]
    }
}

/// Search key for `UID SEARCH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// ALL
    All,
    /// `UID <set>`
    Uid(UidSet),
    /// `NOT <key>`
    Not(Box<Self>),
}

impl SearchCriteria {
    /// Messages whose UID is not in `set`.
    #[must_use]
    pub fn not_uids(set: UidSet) -> Self {
        Self::Not(Box::new(Self::Uid(set)))
    }
}

/// Flag change applied by `UID STORE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// `+FLAGS`
    Add(Vec<Flag>),
    /// `-FLAGS`
    Remove(Vec<Flag>),
    /// `FLAGS`
    Replace(Vec<Flag>),
}

impl StoreAction {
    /// The action undoing this one for flags that were actually changed.
    /// `Replace` has no inverse without knowing the previous flags.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::Add(flags) => Some(Self::Remove(flags.clone())),
            Self::Remove(flags) => Some(Self::Add(flags.clone())),
            Self::Replace(_) => None,
        }
    }
}
