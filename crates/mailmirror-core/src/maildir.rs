//! Maildir message store.
//!
//! Each mailbox is a directory with three subdirectories:
//! - `tmp/`: files being written, never read by anyone else
//! - `new/`: delivered messages that were never flagged locally
//! - `cur/`: messages whose name carries a flag suffix
//!
//! A message is known by its base key, `<secs>.M<micros>P<pid>Q<n>.<host>`.
//! Once flagged, its file name becomes `<key>:2,<flags>` where the flags are
//! sorted maildir letters:
//! - D = Draft
//! - F = Flagged
//! - R = Replied
//! - S = Seen
//! - T = Deleted

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

const TMP: &str = "tmp";
const NEW: &str = "new";
const CUR: &str = "cur";

/// Separator between a base key and its flag suffix.
const INFO_SEPARATOR: &str = ":2,";

static DELIVERIES: AtomicU64 = AtomicU64::new(0);

/// Maps an IMAP system flag to its maildir letter.
///
/// Keywords and `\Recent` have no letter.
#[must_use]
pub fn maildir_flag(flag: &str) -> Option<char> {
    match flag {
        "\\Draft" => Some('D'),
        "\\Flagged" => Some('F'),
        "\\Answered" => Some('R'),
        "\\Seen" => Some('S'),
        "\\Deleted" => Some('T'),
        _ => None,
    }
}

/// Builds the sorted maildir suffix letters for a set of IMAP flags.
#[must_use]
pub fn flag_suffix<'a>(flags: impl IntoIterator<Item = &'a str>) -> String {
    let mut chars: Vec<char> = flags.into_iter().filter_map(maildir_flag).collect();
    chars.sort_unstable();
    chars.dedup();
    chars.into_iter().collect()
}

/// Returns the base key of a maildir file name.
#[must_use]
pub fn base_key(file_name: &str) -> &str {
    file_name
        .find(':')
        .map_or(file_name, |idx| &file_name[..idx])
}

/// One mailbox's maildir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maildir {
    path: PathBuf,
}

impl Maildir {
    /// Wraps an existing or future maildir directory. Nothing is touched
    /// until [`init`](Self::init).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The maildir root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates `tmp/`, `new/` and `cur/` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a directory cannot be created.
    pub fn init(&self) -> Result<()> {
        for sub in [TMP, NEW, CUR] {
            fs::create_dir_all(self.path.join(sub))?;
        }
        Ok(())
    }

    /// Starts a delivery into `tmp/`.
    ///
    /// The message becomes visible in `new/` when the returned writer is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the temporary file cannot be created.
    pub fn create(&self) -> Result<MaildirWriter> {
        let key = unique_key();
        let tmp_path = self.path.join(TMP).join(&key);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        Ok(MaildirWriter {
            file: BufWriter::new(file),
            new_path: self.path.join(NEW).join(&key),
            tmp_path,
            key,
            committed: false,
        })
    }

    /// Finds the single file in `new/` or `cur/` for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is none and
    /// [`Error::Corruption`] if there are several.
    pub fn resolve_key(&self, key: &str) -> Result<PathBuf> {
        let mut found = Vec::new();
        for sub in [NEW, CUR] {
            for (name, path) in self.entries(sub)? {
                if base_key(&name) == key {
                    found.push(path);
                }
            }
        }

        match found.len() {
            0 => Err(Error::NotFound(key.to_string())),
            1 => Ok(found.swap_remove(0)),
            n => Err(Error::Corruption {
                path: self.path.clone(),
                message: format!("{n} files share the key {key}"),
            }),
        }
    }

    /// Renames the message so its suffix encodes `flags`, moving it into
    /// `cur/`.
    ///
    /// # Errors
    ///
    /// Fails if the key does not resolve or the rename fails.
    pub fn set_flags<'a>(
        &self,
        key: &str,
        flags: impl IntoIterator<Item = &'a str>,
    ) -> Result<PathBuf> {
        let current = self.resolve_key(key)?;
        let target = self
            .path
            .join(CUR)
            .join(format!("{key}{INFO_SEPARATOR}{}", flag_suffix(flags)));
        if current != target {
            fs::rename(&current, &target)?;
            tracing::debug!(from = %current.display(), to = %target.display(), "renamed message");
        }
        Ok(target)
    }

    /// Reads the raw message bytes for `key`.
    ///
    /// # Errors
    ///
    /// Fails if the key does not resolve or the file cannot be read.
    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve_key(key)?;
        Ok(fs::read(path)?)
    }

    /// Removes the message for `key`. A missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be removed, or
    /// [`Error::Corruption`] if the key is ambiguous.
    pub fn delete(&self, key: &str) -> Result<()> {
        match self.resolve_key(key) {
            Ok(path) => match fs::remove_file(path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            },
            Err(Error::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Lists the base keys of every delivered message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if `new/` or `cur/` cannot be read.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for sub in [NEW, CUR] {
            for (name, _) in self.entries(sub)? {
                keys.push(base_key(&name).to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn entries(&self, sub: &str) -> Result<Vec<(String, PathBuf)>> {
        let dir = match fs::read_dir(self.path.join(sub)) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            entries.push((name, entry.path()));
        }
        Ok(entries)
    }
}

/// Writer for a message being delivered into `tmp/`.
///
/// Dropping the writer without calling [`close`](Self::close) removes the
/// temporary file.
#[derive(Debug)]
pub struct MaildirWriter {
    file: BufWriter<File>,
    tmp_path: PathBuf,
    new_path: PathBuf,
    key: String,
    committed: bool,
}

impl MaildirWriter {
    /// Base key the message will be stored under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Flushes the message to disk and moves it into `new/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the flush or rename fails; the temporary
    /// file is then removed.
    pub fn close(mut self) -> Result<String> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.new_path)?;
        self.committed = true;
        Ok(std::mem::take(&mut self.key))
    }
}

impl Write for MaildirWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for MaildirWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

fn unique_key() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let n = DELIVERIES.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}.M{}P{}Q{n}.{}",
        now.as_secs(),
        now.subsec_micros(),
        std::process::id(),
        hostname()
    )
}

fn hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        let raw = std::env::var("HOSTNAME")
            .ok()
            .or_else(|| fs::read_to_string("/proc/sys/kernel/hostname").ok())
            .or_else(|| fs::read_to_string("/etc/hostname").ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        raw.replace('/', "\\057").replace(':', "\\072")
    })
}
