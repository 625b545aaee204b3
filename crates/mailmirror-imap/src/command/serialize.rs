//! Serialization helpers shared by the commands.

use super::types::{FetchAttribute, SearchCriteria, StoreAction};

/// Writes an astring: bare when it is a plain atom, quoted otherwise.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Atom-specials plus list wildcards force quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b == 0x7F
}

/// Writes a parenthesized FETCH attribute list.
pub fn write_fetch_attributes(buf: &mut Vec<u8>, attributes: &[FetchAttribute]) {
    buf.push(b'(');
    for (i, attribute) in attributes.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        match attribute {
            FetchAttribute::Envelope => buf.extend_from_slice(b"ENVELOPE"),
            FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
            FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
            FetchAttribute::BodyPeek(section) => {
                buf.extend_from_slice(b"BODY.PEEK[");
                buf.extend_from_slice(section.as_bytes());
                buf.push(b']');
            }
        }
    }
    buf.push(b')');
}

/// Writes a STORE data item such as `+FLAGS.SILENT (\Seen)`.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction, silent: bool) {
    let (item, flags) = match action {
        StoreAction::Add(flags) => ("+FLAGS", flags),
        StoreAction::Remove(flags) => ("-FLAGS", flags),
        StoreAction::Replace(flags) => ("FLAGS", flags),
    };
    buf.extend_from_slice(item.as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.extend_from_slice(b" (");
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes a search key.
pub fn write_search_criteria(buf: &mut Vec<u8>, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::Uid(set) => {
            buf.extend_from_slice(b"UID ");
            buf.extend_from_slice(set.to_string().as_bytes());
        }
        SearchCriteria::Not(inner) => {
            buf.extend_from_slice(b"NOT ");
            write_search_criteria(buf, inner);
        }
    }
}
