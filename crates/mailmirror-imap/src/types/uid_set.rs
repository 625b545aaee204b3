//! UID sets for `UID` commands.

use super::Uid;

/// A set of UIDs in IMAP `sequence-set` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidSet {
    /// One UID.
    Single(Uid),
    /// Inclusive range.
    Range(Uid, Uid),
    /// From a UID up to the highest one (`n:*`).
    RangeFrom(Uid),
    /// Comma-separated members.
    Set(Vec<Self>),
}

impl UidSet {
    /// A set holding one UID.
    #[must_use]
    pub const fn single(uid: Uid) -> Self {
        Self::Single(uid)
    }

    /// Builds a compact set from raw UIDs.
    ///
    /// Values are sorted and deduplicated and zero is dropped. Runs of three
    /// or more consecutive UIDs collapse into a range, so `[12, 13, 17]`
    /// renders as `12,13,17` and `[1, 2, 3, 9]` as `1:3,9`. Returns `None`
    /// when nothing remains.
    #[must_use]
    pub fn from_uids<I>(uids: I) -> Option<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut sorted: Vec<u32> = uids.into_iter().filter(|&u| u != 0).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut parts = Vec::new();
        let mut i = 0;
        while i < sorted.len() {
            let start = sorted[i];
            let mut end = start;
            let mut j = i + 1;
            while j < sorted.len() && end.checked_add(1) == Some(sorted[j]) {
                end = sorted[j];
                j += 1;
            }

            let run = j - i;
            if run >= 3 {
                parts.push(Self::Range(Uid::new(start)?, Uid::new(end)?));
            } else {
                for &uid in &sorted[i..j] {
                    parts.push(Self::Single(Uid::new(uid)?));
                }
            }
            i = j;
        }

        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::Set(parts)),
        }
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(uid) => write!(f, "{uid}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::Set(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn render(uids: &[u32]) -> Option<String> {
        UidSet::from_uids(uids.iter().copied()).map(|s| s.to_string())
    }

    /// Expands a rendered set back into its members.
    fn expand(rendered: &str) -> Vec<u32> {
        let mut out = Vec::new();
        for part in rendered.split(',') {
            if let Some((a, b)) = part.split_once(':') {
                let (a, b): (u32, u32) = (a.parse().unwrap(), b.parse().unwrap());
                out.extend(a..=b);
            } else {
                out.push(part.parse().unwrap());
            }
        }
        out
    }

    #[test]
    fn short_runs_stay_literal() {
        assert_eq!(render(&[12, 13, 17]).as_deref(), Some("12,13,17"));
    }

    #[test]
    fn long_runs_collapse() {
        assert_eq!(render(&[9, 1, 2, 3]).as_deref(), Some("1:3,9"));
        assert_eq!(render(&[5, 6, 7, 8]).as_deref(), Some("5:8"));
    }

    #[test]
    fn duplicates_and_zero_are_dropped() {
        assert_eq!(render(&[4, 0, 4]).as_deref(), Some("4"));
        assert_eq!(render(&[0]), None);
        assert_eq!(render(&[]), None);
    }

    #[test]
    fn range_from_display() {
        let set = UidSet::RangeFrom(Uid::new(100).unwrap());
        assert_eq!(set.to_string(), "100:*");
    }

    proptest! {
        #[test]
        fn rendering_preserves_members(uids in proptest::collection::vec(1u32..500, 1..60)) {
            let mut expected = uids.clone();
            expected.sort_unstable();
            expected.dedup();
            let rendered = render(&uids).unwrap();
            prop_assert_eq!(expand(&rendered), expected);
        }
    }
}
