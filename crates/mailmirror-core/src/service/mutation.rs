//! Changes made on behalf of the user: moving and flagging messages.
//!
//! Every mutation runs in its own task so callers never wait on the
//! network. The returned handle resolves to the outcome, which is also
//! reported as [`SyncEvent::SyncFailed`](crate::SyncEvent::SyncFailed) on
//! failure.

use std::collections::BTreeSet;
use std::future::Future;

use mailmirror_imap::Flag;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};

use super::connector::Connector;
use super::mailer::Mailer;
use super::session::{SharedIndex, read_index, write_index};
use crate::cache::{CacheData, read_uid_validity};
use crate::error::{Error, Result};
use crate::maildir::Maildir;

impl<C: Connector> Mailer<C> {
    /// Moves message `uid` of `mailbox` to `target`.
    ///
    /// Fails with [`Error::UidValidityChanged`] without touching the server
    /// if the mailbox was renumbered since it was mirrored. On success the entry leaves `mailbox`'s index and its file is
    /// deleted; the message shows up in `target` on that mailbox's next
    /// sync.
    pub fn move_message(
        &self,
        account: &str,
        mailbox: &str,
        uid: u32,
        target: &str,
    ) -> JoinHandle<Result<()>> {
        let mailer = self.clone();
        let (account, mailbox, target) = (account.to_string(), mailbox.to_string(), target.to_string());
        self.spawn_mutation(account.clone(), async move {
            mailer.apply_move(&account, &mailbox, uid, &target).await
        })
    }

    /// Sets or clears `\Seen` on message `uid` of `mailbox`.
    pub fn mark_read(
        &self,
        account: &str,
        mailbox: &str,
        uid: u32,
        read: bool,
    ) -> JoinHandle<Result<()>> {
        self.set_flag(account, mailbox, uid, Flag::Seen, read)
    }

    /// Sets or clears `\Flagged` on message `uid` of `mailbox`.
    pub fn mark_flagged(
        &self,
        account: &str,
        mailbox: &str,
        uid: u32,
        flagged: bool,
    ) -> JoinHandle<Result<()>> {
        self.set_flag(account, mailbox, uid, Flag::Flagged, flagged)
    }

    fn set_flag(
        &self,
        account: &str,
        mailbox: &str,
        uid: u32,
        flag: Flag,
        on: bool,
    ) -> JoinHandle<Result<()>> {
        let mailer = self.clone();
        let (account, mailbox) = (account.to_string(), mailbox.to_string());
        self.spawn_mutation(account.clone(), async move {
            mailer.apply_flag(&account, &mailbox, uid, flag, on).await
        })
    }

    fn spawn_mutation<F>(&self, account: String, work: F) -> JoinHandle<Result<()>>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mailer = self.clone();
        let span = info_span!("mutation", account = %account);
        tokio::spawn(
            async move {
                let result = work.await;
                if let Err(err) = &result {
                    error!(%err, "mutation failed");
                    mailer.inner.events.failed(&account, err);
                    if err.is_fatal_for_account() {
                        mailer.forget_session(&account);
                    }
                }
                result
            }
            .instrument(span),
        )
    }

    async fn indexed_entry(
        &self,
        email: &str,
        mailbox: &str,
        uid: u32,
    ) -> Result<(SharedIndex, CacheData)> {
        let session = self.session(email).await?;
        let index = session.cache(&self.inner.data_dir, mailbox)?;
        let entry = read_index(&index)
            .get(uid)
            .cloned()
            .ok_or_else(|| Error::UnknownMessage {
                mailbox: mailbox.to_string(),
                uid,
            })?;
        Ok((index, entry))
    }

    /// UIDVALIDITY the mirror of `mailbox` was built under, if recorded.
    fn mirrored_uid_validity(&self, email: &str, mailbox: &str) -> Result<Option<u32>> {
        read_uid_validity(&self.inner.data_dir.uid_validity_path(email, mailbox))
    }

    async fn apply_move(&self, account: &str, mailbox: &str, uid: u32, target: &str) -> Result<()> {
        let email = self.account_config(account)?.email.clone();
        let (index, entry) = self.indexed_entry(&email, mailbox, uid).await?;
        let stored = self.mirrored_uid_validity(&email, mailbox)?;
        let session = self.session(&email).await?;

        let mut guard = session.lock().await?;
        guard.ensure_same_epoch(mailbox, stored).await?;
        guard.move_message(mailbox, uid, target).await?;
        info!(mailbox, uid, target, "moved message");

        write_index(&index).remove_by_uid(uid)?;
        let maildir = Maildir::new(self.inner.data_dir.mail_dir(&email, mailbox));
        if let Err(err) = maildir.delete(&entry.filename) {
            warn!(mailbox, uid, %err, "moved message file left behind");
        }
        drop(guard);

        self.inner.events.index_changed(&email, mailbox);
        Ok(())
    }

    /// Changes one flag on the server, then renames the maildir file, then
    /// updates the index. A local failure undoes the earlier steps.
    async fn apply_flag(
        &self,
        account: &str,
        mailbox: &str,
        uid: u32,
        flag: Flag,
        on: bool,
    ) -> Result<()> {
        let email = self.account_config(account)?.email.clone();
        let (index, entry) = self.indexed_entry(&email, mailbox, uid).await?;
        let stored = self.mirrored_uid_validity(&email, mailbox)?;
        let session = self.session(&email).await?;

        let mut flags = entry.flags.clone();
        if on {
            flags.insert(flag.as_str().to_string());
        } else {
            flags.remove(flag.as_str());
        }
        let (add, remove) = if on {
            (vec![flag], Vec::new())
        } else {
            (Vec::new(), vec![flag])
        };

        let mut guard = session.lock().await?;
        guard.ensure_same_epoch(mailbox, stored).await?;
        guard.store_flags(mailbox, uid, &add, &remove).await?;

        let maildir = Maildir::new(self.inner.data_dir.mail_dir(&email, mailbox));
        if let Err(err) = apply_local_flags(&maildir, &index, mailbox, &entry, flags) {
            warn!(mailbox, uid, %err, "local flag change failed; reverting server");
            if let Err(revert) = guard.store_flags(mailbox, uid, &remove, &add).await {
                error!(mailbox, uid, %revert, "could not revert server flags");
            }
            return Err(err);
        }
        drop(guard);

        self.inner.events.index_changed(&email, mailbox);
        Ok(())
    }
}

fn apply_local_flags(
    maildir: &Maildir,
    index: &SharedIndex,
    mailbox: &str,
    entry: &CacheData,
    flags: BTreeSet<String>,
) -> Result<()> {
    maildir.set_flags(&entry.filename, flags.iter().map(String::as_str))?;
    match write_index(index).update_flags(entry.uid, flags) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::UnknownMessage {
            mailbox: mailbox.to_string(),
            uid: entry.uid,
        }),
        Err(err) => {
            if let Err(revert) =
                maildir.set_flags(&entry.filename, entry.flags.iter().map(String::as_str))
            {
                error!(uid = entry.uid, %revert, "could not restore maildir flags");
            }
            Err(err)
        }
    }
}
