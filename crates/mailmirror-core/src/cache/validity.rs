//! Persisted UIDVALIDITY of a mailbox.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;
use crate::fs::write_atomic;

/// Reads the stored UIDVALIDITY.
///
/// Returns `None` when nothing usable is stored; a garbled file is treated
/// like a missing one.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file exists but cannot be
/// read.
pub fn read_uid_validity(path: &Path) -> Result<Option<u32>> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let parsed = text.trim().parse().ok();
            if parsed.is_none() {
                tracing::warn!(path = %path.display(), "ignoring unreadable UIDVALIDITY");
            }
            Ok(parsed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Stores a UIDVALIDITY atomically.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the write fails.
pub fn write_uid_validity(path: &Path, value: u32) -> Result<()> {
    write_atomic(path, format!("{value}\n").as_bytes())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn round_trip_and_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uid-validity");
        assert_eq!(read_uid_validity(&path).unwrap(), None);
        write_uid_validity(&path, 1_234_567).unwrap();
        assert_eq!(read_uid_validity(&path).unwrap(), Some(1_234_567));
    }

    #[test]
    fn garbage_reads_as_unknown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uid-validity");
        fs::write(&path, "not a number").unwrap();
        assert_eq!(read_uid_validity(&path).unwrap(), None);
    }
}
