//! On-disk layout of the data directory.

use std::path::{Path, PathBuf};

use crate::encoding::encode;
use crate::error::{Error, Result};

/// Environment variable overriding the data directory root.
pub const DATA_DIR_ENV: &str = "MAILMIRROR_DATA_DIR";

/// File name of a mailbox's message index.
pub const CACHE_INDEX_FILE: &str = "cached-messages.json";

/// File name of a mailbox's persisted UIDVALIDITY.
pub const UID_VALIDITY_FILE: &str = "uid-validity";

/// File name of a mailbox's list of UIDs too large to mirror.
pub const SKIPPED_UIDS_FILE: &str = "skipped-uids.json";

/// Root of everything the mirror stores.
///
/// Account addresses and mailbox names only ever reach the filesystem
/// through [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Uses `root` as the data directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the data directory from [`DATA_DIR_ENV`], falling back to
    /// the platform's per-user data directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if neither is available.
    pub fn from_env() -> Result<Self> {
        if let Some(root) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }
        dirs::data_dir()
            .map(|dir| Self::new(dir.join("mailmirror")))
            .ok_or_else(|| {
                Error::Config(format!("no data directory; set {DATA_DIR_ENV}"))
            })
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `mail/<account>/`
    #[must_use]
    pub fn account_mail_dir(&self, account: &str) -> PathBuf {
        self.root.join("mail").join(encode(account))
    }

    /// `mail/<account>/<mailbox>/`, the maildir of one mailbox.
    #[must_use]
    pub fn mail_dir(&self, account: &str, mailbox: &str) -> PathBuf {
        self.account_mail_dir(account).join(encode(mailbox))
    }

    /// `caching/<account>/<mailbox>/`
    #[must_use]
    pub fn cache_dir(&self, account: &str, mailbox: &str) -> PathBuf {
        self.root
            .join("caching")
            .join(encode(account))
            .join(encode(mailbox))
    }

    /// Path of a mailbox's `cached-messages.json`.
    #[must_use]
    pub fn cache_index_path(&self, account: &str, mailbox: &str) -> PathBuf {
        self.cache_dir(account, mailbox).join(CACHE_INDEX_FILE)
    }

    /// Path of a mailbox's persisted UIDVALIDITY.
    #[must_use]
    pub fn uid_validity_path(&self, account: &str, mailbox: &str) -> PathBuf {
        self.cache_dir(account, mailbox).join(UID_VALIDITY_FILE)
    }

    /// Path of a mailbox's skipped UIDs.
    #[must_use]
    pub fn skipped_uids_path(&self, account: &str, mailbox: &str) -> PathBuf {
        self.cache_dir(account, mailbox).join(SKIPPED_UIDS_FILE)
    }

    /// `auth/<account>/<provider>-token.json`
    #[must_use]
    pub fn token_path(&self, account: &str, provider: &str) -> PathBuf {
        self.root
            .join("auth")
            .join(encode(account))
            .join(format!("{provider}-token.json"))
    }
}
