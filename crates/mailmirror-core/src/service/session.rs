//! One authenticated IMAP connection per account.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use mailmirror_imap::{
    Client, Config, FetchAttribute, FetchStream, Flag, MailboxStatus, SearchCriteria, StoreAction,
    Uid, UidSet, UidValidity,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::connector::Connector;
use crate::account::Token;
use crate::cache::CacheIndex;
use crate::error::{Error, Result};
use crate::layout::DataDir;

/// A mailbox index shared between the sync engine, mutations and readers.
pub type SharedIndex = Arc<RwLock<CacheIndex>>;

pub(crate) fn read_index(index: &SharedIndex) -> RwLockReadGuard<'_, CacheIndex> {
    index.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_index(index: &SharedIndex) -> RwLockWriteGuard<'_, CacheIndex> {
    index.write().unwrap_or_else(PoisonError::into_inner)
}

/// An authenticated connection and the indexes of the mailboxes it has
/// touched.
///
/// Every IMAP command goes through [`lock`](Self::lock), so at most one
/// command is in flight on the connection.
pub struct AccountSession<S> {
    email: String,
    client: Mutex<Option<Client<S>>>,
    supports_move: bool,
    supports_uidplus: bool,
    caches: StdMutex<HashMap<String, SharedIndex>>,
}

impl<S> std::fmt::Debug for AccountSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSession")
            .field("email", &self.email)
            .field("supports_move", &self.supports_move)
            .field("supports_uidplus", &self.supports_uidplus)
            .finish_non_exhaustive()
    }
}

impl<S> AccountSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Connects, signs in with XOAUTH2 and records the capabilities.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] if the server cannot be reached,
    /// [`Error::AuthChallenge`] or [`Error::Auth`] if the token is refused.
    pub async fn open<C>(connector: &C, config: &Config, email: &str, token: &Token) -> Result<Self>
    where
        C: Connector<Stream = S>,
    {
        info!(host = %config.host, port = config.port, "connecting");
        let stream = connector.connect(config).await?;
        let mut client = Client::from_stream(stream, config).await?;
        client.authenticate_xoauth2(email, &token.access_token).await?;
        client.capability().await?;

        let supports_move = client.supports_move();
        let supports_uidplus = client.supports_uidplus();
        info!(supports_move, supports_uidplus, "signed in");

        Ok(Self {
            email: email.to_string(),
            client: Mutex::new(Some(client)),
            supports_move,
            supports_uidplus,
            caches: StdMutex::new(HashMap::new()),
        })
    }

    /// Account address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// True if the server advertised MOVE.
    #[must_use]
    pub const fn supports_move(&self) -> bool {
        self.supports_move
    }

    /// Waits for exclusive use of the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after [`close`](Self::close).
    pub async fn lock(&self) -> Result<SessionGuard<'_, S>> {
        let client = self.client.lock().await;
        if client.is_none() {
            return Err(Error::SessionClosed(self.email.clone()));
        }
        Ok(SessionGuard {
            session: self,
            client,
        })
    }

    /// Names of the account's selectable mailboxes (`LIST "" "*"`).
    ///
    /// # Errors
    ///
    /// Network or protocol failure.
    pub async fn list_mailboxes(&self) -> Result<Vec<String>> {
        let mut guard = self.lock().await?;
        let listed = guard.client()?.list("", "*").await?;
        let names: Vec<String> = listed
            .into_iter()
            .filter(|m| m.is_selectable())
            .map(|m| m.name)
            .collect();
        debug!(count = names.len(), "listed mailboxes");
        Ok(names)
    }

    /// Logs out and releases the connection. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns the LOGOUT failure; the connection is released regardless.
    pub async fn close(&self) -> Result<()> {
        let Some(mut client) = self.client.lock().await.take() else {
            return Ok(());
        };
        info!(account = %self.email, "logging out");
        client.logout().await?;
        Ok(())
    }

    /// The index of `mailbox`, loaded from disk on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the index cannot be read or set aside.
    pub fn cache(&self, data_dir: &DataDir, mailbox: &str) -> Result<SharedIndex> {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = caches.get(mailbox) {
            return Ok(Arc::clone(index));
        }
        let index = CacheIndex::load_or_recover(data_dir.cache_index_path(&self.email, mailbox))?;
        let index = Arc::new(RwLock::new(index));
        caches.insert(mailbox.to_string(), Arc::clone(&index));
        Ok(index)
    }

    /// The index of `mailbox` if this session already loaded it.
    #[must_use]
    pub fn loaded_cache(&self, mailbox: &str) -> Option<SharedIndex> {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(mailbox)
            .cloned()
    }
}

/// Exclusive use of a session's connection.
pub struct SessionGuard<'a, S> {
    session: &'a AccountSession<S>,
    client: MutexGuard<'a, Option<Client<S>>>,
}

impl<S> SessionGuard<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn client(&mut self) -> Result<&mut Client<S>> {
        let session = self.session;
        self.client
            .as_mut()
            .ok_or_else(|| Error::SessionClosed(session.email.clone()))
    }

    /// Selects `mailbox`.
    ///
    /// # Errors
    ///
    /// Network failure, or [`Error::Protocol`] if the server refuses.
    pub async fn select(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        let status = self.client()?.select(mailbox).await?;
        debug!(
            mailbox,
            exists = status.exists,
            uid_validity = status.uid_validity.map(UidValidity::get),
            "selected"
        );
        Ok(status)
    }

    /// Selects `mailbox` unless it already is, and returns its
    /// UIDVALIDITY.
    ///
    /// # Errors
    ///
    /// Same as [`select`](Self::select).
    pub async fn ensure_selected(&mut self, mailbox: &str) -> Result<Option<u32>> {
        let client = self.client()?;
        if client.selected_mailbox() == Some(mailbox) {
            return Ok(client.selected_uid_validity().map(UidValidity::get));
        }
        let status = self.select(mailbox).await?;
        Ok(status.uid_validity.map(UidValidity::get))
    }

    /// Selects `mailbox` and checks that the server still numbers it the way
    /// it did when `stored` was recorded.
    ///
    /// # Errors
    ///
    /// [`Error::UidValidityChanged`] on a mismatch, otherwise the same as
    /// [`select`](Self::select).
    pub async fn ensure_same_epoch(&mut self, mailbox: &str, stored: Option<u32>) -> Result<()> {
        let current = self.ensure_selected(mailbox).await?;
        if let (Some(stored), Some(current)) = (stored, current)
            && stored != current
        {
            return Err(Error::UidValidityChanged {
                mailbox: mailbox.to_string(),
                stored,
                current,
            });
        }
        Ok(())
    }

    /// Starts fetching the messages of `mailbox` whose UIDs are not in
    /// `known`.
    ///
    /// Searches `ALL` when nothing is known yet and `NOT UID <known>`
    /// otherwise, then streams `ENVELOPE`, `UID`, `BODY.PEEK[HEADER]` and
    /// `BODY.PEEK[TEXT]` of the result. Returns `None` if nothing is new.
    ///
    /// # Errors
    ///
    /// Network or protocol failure.
    pub async fn fetch_delta(
        &mut self,
        mailbox: &str,
        known: &[u32],
    ) -> Result<Option<FetchStream<'_, S>>> {
        self.ensure_selected(mailbox).await?;
        let client = self.client()?;

        let criteria = UidSet::from_uids(known.iter().copied())
            .map_or(SearchCriteria::All, SearchCriteria::not_uids);
        let mut uids = client.uid_search(&criteria).await?;

        let known: HashSet<u32> = known.iter().copied().collect();
        uids.retain(|uid| !known.contains(uid));
        debug!(mailbox, new = uids.len(), "searched for new messages");

        let Some(set) = UidSet::from_uids(uids) else {
            return Ok(None);
        };
        let stream = client.uid_fetch(&set, &FetchAttribute::mirror()).await?;
        Ok(Some(stream))
    }

    /// Moves one message of `mailbox` to `target`.
    ///
    /// Without MOVE the message is copied, marked `\Deleted` and expunged
    /// (by UID when UIDPLUS is available).
    ///
    /// # Errors
    ///
    /// Network or protocol failure.
    pub async fn move_message(&mut self, mailbox: &str, uid: u32, target: &str) -> Result<()> {
        self.ensure_selected(mailbox).await?;
        let set = single(uid)?;
        let supports_move = self.session.supports_move;
        let supports_uidplus = self.session.supports_uidplus;
        let client = self.client()?;

        if supports_move {
            client.uid_move(&set, target).await?;
        } else {
            debug!(uid, "MOVE unavailable; copying and expunging");
            client.uid_copy(&set, target).await?;
            client
                .uid_store(&set, &StoreAction::Add(vec![Flag::Deleted]))
                .await?;
            if supports_uidplus {
                client.uid_expunge(&set).await?;
            } else {
                client.expunge().await?;
            }
        }
        Ok(())
    }

    /// Adds and removes flags on one message of `mailbox`.
    ///
    /// # Errors
    ///
    /// Network or protocol failure.
    pub async fn store_flags(
        &mut self,
        mailbox: &str,
        uid: u32,
        add: &[Flag],
        remove: &[Flag],
    ) -> Result<()> {
        self.ensure_selected(mailbox).await?;
        let set = single(uid)?;
        let client = self.client()?;
        if !add.is_empty() {
            client.uid_store(&set, &StoreAction::Add(add.to_vec())).await?;
        }
        if !remove.is_empty() {
            client
                .uid_store(&set, &StoreAction::Remove(remove.to_vec()))
                .await?;
        }
        Ok(())
    }
}

fn single(uid: u32) -> Result<UidSet> {
    Uid::new(uid)
        .map(UidSet::single)
        .ok_or_else(|| Error::Protocol("UID 0 is not valid".to_string()))
}
