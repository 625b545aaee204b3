//! The `cached-messages.json` index of one mailbox.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::model::CacheData;
use crate::error::{Error, Result};
use crate::fs::write_atomic;

/// In-memory mirror of a mailbox's index file.
///
/// Entries keep fetch order. Every mutation rewrites the whole file through
/// a temporary file and a rename; if the rewrite fails the in-memory change
/// is undone, so memory always matches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheIndex {
    path: PathBuf,
    entries: Vec<CacheData>,
}

impl CacheIndex {
    /// An empty index that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Loads the index at `path`.
    ///
    /// A missing, empty or truncated file yields an empty index: those are
    /// left behind by an interrupted sync and are repaired by refetching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] for malformed JSON and [`Error::Io`] if
    /// the file cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::empty(path)),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty(path));
        }

        let entries: Vec<CacheData> = match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) if e.is_eof() => {
                tracing::warn!(path = %path.display(), "truncated index; starting empty");
                return Ok(Self::empty(path));
            }
            Err(e) => {
                return Err(Error::Corruption {
                    path,
                    message: e.to_string(),
                });
            }
        };

        let mut seen = HashSet::with_capacity(entries.len());
        let total = entries.len();
        let entries: Vec<CacheData> = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.uid))
            .collect();
        if entries.len() != total {
            tracing::warn!(
                path = %path.display(),
                dropped = total - entries.len(),
                "dropped duplicate UIDs from index"
            );
        }

        Ok(Self { path, entries })
    }

    /// Loads the index, setting a corrupt file aside.
    ///
    /// A corrupt file is renamed to `<name>.corrupt.<timestamp>` and an empty
    /// index is returned, so the mailbox is downloaded again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read or renamed.
    pub fn load_or_recover(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match Self::load(&path) {
            Err(Error::Corruption { message, .. }) => {
                let mut aside = path.clone().into_os_string();
                aside.push(format!(".corrupt.{}", Utc::now().format("%Y%m%d%H%M%S")));
                let aside = PathBuf::from(aside);
                fs::rename(&path, &aside)?;
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    %message,
                    "corrupt index set aside"
                );
                Ok(Self::empty(path))
            }
            other => other,
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in fetch order.
    #[must_use]
    pub fn entries(&self) -> &[CacheData] {
        &self.entries
    }

    /// The entry for `uid`.
    #[must_use]
    pub fn get(&self, uid: u32) -> Option<&CacheData> {
        self.entries.iter().find(|e| e.uid == uid)
    }

    /// True if `uid` is indexed.
    #[must_use]
    pub fn contains_uid(&self, uid: u32) -> bool {
        self.get(uid).is_some()
    }

    /// UIDs in fetch order.
    #[must_use]
    pub fn known_uids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.uid).collect()
    }

    /// Copy of the entries for readers that must not hold the index.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CacheData> {
        self.entries.clone()
    }

    /// Copy of the entries, newest `Date` first.
    ///
    /// Messages without a parsable date go last; ties keep fetch order.
    #[must_use]
    pub fn sorted_by_date_desc(&self) -> Vec<CacheData> {
        let mut sorted = self.snapshot();
        sorted.sort_by_cached_key(|entry| {
            let date = entry.envelope.parsed_date();
            (date.is_none(), Reverse(date))
        });
        sorted
    }

    /// Appends an entry and persists.
    ///
    /// Returns `false` without writing if the UID is already indexed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rewrite fails; the entry is not kept.
    pub fn append(&mut self, entry: CacheData) -> Result<bool> {
        if self.contains_uid(entry.uid) {
            return Ok(false);
        }
        self.entries.push(entry);
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        Ok(true)
    }

    /// Removes the entry for `uid` and persists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rewrite fails; the entry is kept.
    pub fn remove_by_uid(&mut self, uid: u32) -> Result<Option<CacheData>> {
        let Some(pos) = self.entries.iter().position(|e| e.uid == uid) else {
            return Ok(None);
        };
        let removed = self.entries.remove(pos);
        if let Err(e) = self.persist() {
            self.entries.insert(pos, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// Replaces the flags of `uid` and persists.
    ///
    /// Returns `false` if the UID is not indexed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rewrite fails; the old flags are kept.
    pub fn update_flags(&mut self, uid: u32, flags: BTreeSet<String>) -> Result<bool> {
        let Some(pos) = self.entries.iter().position(|e| e.uid == uid) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut self.entries[pos].flags, flags);
        if let Err(e) = self.persist() {
            self.entries[pos].flags = previous;
            return Err(e);
        }
        Ok(true)
    }

    /// Drops every entry and persists, returning what was removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rewrite fails; the entries are kept.
    pub fn clear(&mut self) -> Result<Vec<CacheData>> {
        let removed = std::mem::take(&mut self.entries);
        if let Err(e) = self.persist() {
            self.entries = removed;
            return Err(e);
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(&self.entries).map_err(|e| Error::Corruption {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::cache::model::{Address, Envelope};

    fn entry(uid: u32, date: Option<&str>) -> CacheData {
        CacheData::new(
            Envelope {
                date: date.map(str::to_string),
                subject: Some(format!("message {uid}")),
                from: vec![Address::new("Sender", "sender@example.com")],
                ..Envelope::default()
            },
            uid,
            format!("key{uid}"),
        )
    }

    fn index_path(dir: &TempDir) -> PathBuf {
        dir.path().join("caching").join("cached-messages.json")
    }

    #[test]
    fn missing_or_empty_file_is_empty_index() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        assert!(CacheIndex::load(&path).unwrap().is_empty());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        assert!(CacheIndex::load(&path).unwrap().is_empty());
        fs::write(&path, "  \n").unwrap();
        assert!(CacheIndex::load(&path).unwrap().is_empty());
    }

    #[test]
    fn truncated_file_is_empty_index() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"[{"envelope":{},"uid":12,"filename":"k"#).unwrap();
        assert!(CacheIndex::load(&path).unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json}").unwrap();
        assert!(matches!(
            CacheIndex::load(&path),
            Err(Error::Corruption { .. })
        ));
    }

    #[test]
    fn corrupt_file_is_set_aside() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json}").unwrap();

        let index = CacheIndex::load_or_recover(&path).unwrap();
        assert!(index.is_empty());
        assert!(!path.exists());
        let names: Vec<String> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("cached-messages.json.corrupt."));
    }

    #[test]
    fn append_persists_in_order_and_skips_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        let mut index = CacheIndex::load(&path).unwrap();

        assert!(index.append(entry(12, None)).unwrap());
        assert!(index.append(entry(13, None)).unwrap());
        assert!(!index.append(entry(12, None)).unwrap());

        let reloaded = CacheIndex::load(&path).unwrap();
        assert_eq!(reloaded.known_uids(), vec![12, 13]);
        assert_eq!(reloaded, index);
    }

    #[test]
    fn duplicate_uids_on_disk_keep_first() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut second = entry(5, None);
        second.filename = "other".into();
        fs::write(&path, serde_json::to_vec(&[entry(5, None), second]).unwrap()).unwrap();

        let index = CacheIndex::load(&path).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(5).unwrap().filename, "key5");
    }

    #[test]
    fn remove_and_update_flags() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        let mut index = CacheIndex::empty(&path);
        for uid in [12, 13, 17] {
            index.append(entry(uid, None)).unwrap();
        }

        let flags: BTreeSet<String> = ["\\Seen".to_string()].into();
        assert!(index.update_flags(13, flags.clone()).unwrap());
        assert!(!index.update_flags(99, flags.clone()).unwrap());
        assert_eq!(index.remove_by_uid(17).unwrap().unwrap().uid, 17);
        assert!(index.remove_by_uid(17).unwrap().is_none());

        let reloaded = CacheIndex::load(&path).unwrap();
        assert_eq!(reloaded.known_uids(), vec![12, 13]);
        assert_eq!(reloaded.get(13).unwrap().flags, flags);
    }

    #[test]
    fn failed_rewrite_rolls_back() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes every rename fail.
        let path = dir.path().join("blocked");
        fs::create_dir_all(path.join("child")).unwrap();

        let mut index = CacheIndex::empty(&path);
        assert!(index.append(entry(1, None)).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn clear_returns_removed_entries() {
        let dir = TempDir::new().unwrap();
        let path = index_path(&dir);
        let mut index = CacheIndex::empty(&path);
        index.append(entry(1, None)).unwrap();
        index.append(entry(2, None)).unwrap();

        let removed = index.clear().unwrap();
        assert_eq!(removed.len(), 2);
        assert!(CacheIndex::load(&path).unwrap().is_empty());
    }

    #[test]
    fn sorted_newest_first_undated_last() {
        let mut index = CacheIndex::empty("unused.json");
        index.entries = vec![
            entry(1, Some("Mon, 13 Nov 2023 10:00:00 +0000")),
            entry(2, None),
            entry(3, Some("Tue, 14 Nov 2023 10:00:00 +0000")),
            entry(4, Some("Mon, 13 Nov 2023 12:00:00 +0200")),
            entry(5, Some("garbage")),
        ];
        let uids: Vec<u32> = index.sorted_by_date_desc().iter().map(|e| e.uid).collect();
        // 1 and 4 are the same instant; fetch order breaks the tie.
        assert_eq!(uids, vec![3, 1, 4, 2, 5]);
        assert_eq!(index.known_uids(), vec![1, 2, 3, 4, 5]);
    }

    proptest! {
        #[test]
        fn save_then_load_preserves_sequence(
            uids in proptest::collection::hash_set(1u32..10_000, 0..20),
            subject in "\\PC{0,20}",
            seen in any::<bool>(),
        ) {
            let dir = TempDir::new().unwrap();
            let path = index_path(&dir);
            let mut index = CacheIndex::empty(&path);
            for uid in uids {
                let mut e = entry(uid, Some("Tue, 14 Nov 2023 22:13:20 +0000"));
                e.envelope.subject = Some(subject.clone());
                if seen {
                    e.flags.insert("\\Seen".into());
                }
                index.append(e).unwrap();
            }
            prop_assert_eq!(CacheIndex::load(&path).unwrap(), index);
        }
    }
}
