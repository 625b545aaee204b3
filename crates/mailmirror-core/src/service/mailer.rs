//! The `Mailer` facade and its session registry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{Instrument, info, info_span, warn};

use super::connector::Connector;
use super::session::{AccountSession, SharedIndex, read_index};
use crate::account::{AccountConfig, Settings, load_token};
use crate::cache::{CacheData, CacheIndex};
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::layout::DataDir;
use crate::maildir::Maildir;

type Session<C> = AccountSession<<C as Connector>::Stream>;

/// Entry point of the mirror.
///
/// Cloning is cheap; clones share sessions and state, which is how
/// background tasks get hold of the mailer.
pub struct Mailer<C: Connector> {
    pub(super) inner: Arc<Inner<C>>,
}

pub(super) struct Inner<C: Connector> {
    pub(super) data_dir: DataDir,
    pub(super) settings: Settings,
    pub(super) connector: C,
    pub(super) events: EventSink,
    sessions: Mutex<HashMap<String, Arc<Session<C>>>>,
    syncing: Mutex<HashSet<String>>,
}

impl<C: Connector> Clone for Mailer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> std::fmt::Debug for Mailer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("data_dir", &self.inner.data_dir)
            .field("accounts", &self.accounts())
            .finish_non_exhaustive()
    }
}

/// Marks an account as syncing for as long as it lives.
pub(super) struct SyncGuard<'a> {
    syncing: &'a Mutex<HashSet<String>>,
    account: String,
}

impl<'a> SyncGuard<'a> {
    fn acquire(syncing: &'a Mutex<HashSet<String>>, account: &str) -> Option<Self> {
        let inserted = syncing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account.to_string());
        inserted.then(|| Self {
            syncing,
            account: account.to_string(),
        })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.syncing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.account);
    }
}

impl<C: Connector> Mailer<C> {
    /// Creates a mailer. No connection is made until an account is synced
    /// or signed in.
    pub fn new(data_dir: DataDir, settings: Settings, connector: C, events: EventSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                data_dir,
                settings,
                connector,
                events,
                sessions: Mutex::new(HashMap::new()),
                syncing: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &DataDir {
        &self.inner.data_dir
    }

    /// The settings the mailer was created with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Configured account addresses.
    #[must_use]
    pub fn accounts(&self) -> Vec<String> {
        self.inner
            .settings
            .accounts
            .iter()
            .map(|a| a.email.clone())
            .collect()
    }

    pub(super) fn account_config(&self, account: &str) -> Result<&AccountConfig> {
        self.inner
            .settings
            .account(account)
            .ok_or_else(|| Error::Config(format!("unknown account {account}")))
    }

    /// Opens a new session for `account`, replacing any existing one.
    ///
    /// The token is read from the data directory; an expired or missing
    /// token fails before anything is dialed.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an unknown account, [`Error::Auth`] or
    /// [`Error::AuthChallenge`] for token problems, [`Error::Network`] if
    /// the server cannot be reached.
    pub async fn sign_in(&self, account: &str) -> Result<Arc<Session<C>>> {
        let config = self.account_config(account)?;
        let email = config.email.clone();
        let token = load_token(&self.inner.data_dir, &email, config.provider())?;
        let imap = config
            .imap_config(self.inner.settings.idle_timeout())?
            .with_max_literal_size(self.inner.settings.max_message_size);

        let session = AccountSession::open(&self.inner.connector, &imap, &email, &token)
            .instrument(info_span!("sign_in", account = %email))
            .await?;
        let session = Arc::new(session);

        let replaced = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(email.clone(), Arc::clone(&session));
        if replaced.is_some() {
            info!(account = %email, "replaced existing session");
        }
        Ok(session)
    }

    /// The live session of `account`, signing in if there is none.
    ///
    /// # Errors
    ///
    /// Same as [`sign_in`](Self::sign_in).
    pub async fn session(&self, account: &str) -> Result<Arc<Session<C>>> {
        if let Some(session) = self.existing_session(account) {
            return Ok(session);
        }
        self.sign_in(account).await
    }

    /// True if `account` has a live session.
    #[must_use]
    pub fn is_signed_in(&self, account: &str) -> bool {
        self.existing_session(account).is_some()
    }

    fn existing_session(&self, account: &str) -> Option<Arc<Session<C>>> {
        let email = self.account_config(account).ok()?.email.as_str();
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(email)
            .cloned()
    }

    /// Drops a session whose connection can no longer be trusted.
    pub(super) fn forget_session(&self, account: &str) {
        let email = self
            .account_config(account)
            .map_or(account, |c| c.email.as_str());
        let removed = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(email);
        if removed.is_some() {
            info!(account = email, "dropped session");
        }
    }

    /// Logs `account` out and forgets its session.
    ///
    /// # Errors
    ///
    /// Returns the LOGOUT failure.
    pub async fn sign_out(&self, account: &str) -> Result<()> {
        let email = self.account_config(account)?.email.clone();
        let session = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&email);
        match session {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    /// Logs every session out.
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (account, session) in sessions {
            if let Err(err) = session.close().await {
                warn!(account, %err, "logout failed");
            }
        }
    }

    pub(super) fn begin_sync(&self, account: &str) -> Option<SyncGuard<'_>> {
        SyncGuard::acquire(&self.inner.syncing, account)
    }

    /// True while `account` is being synced.
    #[must_use]
    pub fn is_syncing(&self, account: &str) -> bool {
        self.inner
            .syncing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(account)
    }

    /// The index of a mailbox: the session's copy when signed in, the file
    /// on disk otherwise.
    fn index(&self, email: &str, mailbox: &str) -> Result<SharedIndex> {
        if let Some(session) = self.existing_session(email) {
            return session.cache(&self.inner.data_dir, mailbox);
        }
        let index = CacheIndex::load(self.inner.data_dir.cache_index_path(email, mailbox))?;
        Ok(Arc::new(std::sync::RwLock::new(index)))
    }

    /// Copy of a mailbox's index in fetch order.
    ///
    /// Never fails: an unreadable index is logged and reported as empty.
    #[must_use]
    pub fn snapshot(&self, account: &str, mailbox: &str) -> Vec<CacheData> {
        let email = self
            .account_config(account)
            .map_or_else(|_| account.to_string(), |c| c.email.clone());
        match self.index(&email, mailbox) {
            Ok(index) => read_index(&index).snapshot(),
            Err(err) => {
                warn!(account = %email, mailbox, %err, "index unavailable");
                Vec::new()
            }
        }
    }

    /// Like [`snapshot`](Self::snapshot), newest first.
    #[must_use]
    pub fn snapshot_by_date(&self, account: &str, mailbox: &str) -> Vec<CacheData> {
        let email = self
            .account_config(account)
            .map_or_else(|_| account.to_string(), |c| c.email.clone());
        match self.index(&email, mailbox) {
            Ok(index) => read_index(&index).sorted_by_date_desc(),
            Err(err) => {
                warn!(account = %email, mailbox, %err, "index unavailable");
                Vec::new()
            }
        }
    }

    /// Raw RFC 5322 bytes of a mirrored message.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownMessage`] if the UID is not indexed,
    /// [`Error::NotFound`] if its file is gone, [`Error::Io`] on read
    /// failure.
    pub fn read_message(&self, account: &str, mailbox: &str, uid: u32) -> Result<Vec<u8>> {
        let email = self.account_config(account)?.email.clone();
        let index = self.index(&email, mailbox)?;
        let filename = read_index(&index)
            .get(uid)
            .map(|entry| entry.filename.clone())
            .ok_or_else(|| Error::UnknownMessage {
                mailbox: mailbox.to_string(),
                uid,
            })?;
        Maildir::new(self.inner.data_dir.mail_dir(&email, mailbox)).read(&filename)
    }

    /// Deletes maildir files of `mailbox` that no index entry refers to.
    ///
    /// Such orphans are left when a delivery finished but the index append
    /// did not. Nothing is done while the account is syncing, since a file
    /// being indexed would look orphaned. Returns the deleted keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the maildir cannot be listed or a file
    /// cannot be removed.
    pub fn reconcile_orphans(&self, account: &str, mailbox: &str) -> Result<Vec<String>> {
        let email = self.account_config(account)?.email.clone();
        let Some(_guard) = self.begin_sync(&email) else {
            info!(account = %email, mailbox, "sync in progress; skipping cleanup");
            return Ok(Vec::new());
        };

        let index = self.index(&email, mailbox)?;
        let referenced: HashSet<String> = read_index(&index)
            .entries()
            .iter()
            .map(|e| e.filename.clone())
            .collect();

        let maildir = Maildir::new(self.inner.data_dir.mail_dir(&email, mailbox));
        let mut removed = Vec::new();
        for key in maildir.keys()? {
            if !referenced.contains(&key) {
                maildir.delete(&key)?;
                removed.push(key);
            }
        }
        if !removed.is_empty() {
            info!(account = %email, mailbox, count = removed.len(), "removed orphan messages");
        }
        Ok(removed)
    }
}
