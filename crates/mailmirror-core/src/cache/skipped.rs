//! UIDs the mirror gave up on because a body part was over the size cap.
//!
//! Stored as a sorted JSON array next to the index. Listed UIDs are left
//! out of every later search until the mailbox's UIDVALIDITY changes.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;
use crate::fs::write_atomic;

/// Reads the skipped UIDs. A missing or garbled file reads as none.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file exists but cannot be
/// read.
pub fn read_skipped_uids(path: &Path) -> Result<BTreeSet<u32>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), %err, "ignoring unreadable skipped UIDs");
        BTreeSet::new()
    }))
}

/// Replaces the skipped UIDs; an empty set removes the file.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the write fails.
pub fn write_skipped_uids(path: &Path, uids: &BTreeSet<u32>) -> Result<()> {
    if uids.is_empty() {
        return match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
    }
    let json = serde_json::to_vec(uids).map_err(io::Error::other)?;
    write_atomic(path, &json)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn stored_sorted_and_cleared() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skipped-uids.json");
        assert!(read_skipped_uids(&path).unwrap().is_empty());

        write_skipped_uids(&path, &BTreeSet::from([13, 4])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[4,13]");
        assert_eq!(read_skipped_uids(&path).unwrap(), BTreeSet::from([4, 13]));

        write_skipped_uids(&path, &BTreeSet::new()).unwrap();
        assert!(!path.exists());
        write_skipped_uids(&path, &BTreeSet::new()).unwrap();
    }

    #[test]
    fn garbage_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skipped-uids.json");
        fs::write(&path, "{not json").unwrap();
        assert!(read_skipped_uids(&path).unwrap().is_empty());
    }
}
