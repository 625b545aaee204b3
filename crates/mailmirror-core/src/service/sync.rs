//! Incremental mirroring of every mailbox of every account.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;

use mailmirror_imap::{FetchedMessage, MailboxStatus, UidValidity};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::connector::Connector;
use super::mailer::Mailer;
use super::session::{AccountSession, SharedIndex, read_index, write_index};
use crate::cache::{
    CacheData, read_skipped_uids, read_uid_validity, write_skipped_uids, write_uid_validity,
};
use crate::error::Result;
use crate::events::SyncEvent;
use crate::maildir::Maildir;

impl<C: Connector> Mailer<C> {
    /// Syncs every configured account, each in its own task.
    ///
    /// Failures are reported as [`SyncEvent::SyncFailed`] and in the
    /// returned list. Dropping the future aborts the account tasks.
    pub async fn sync_all(&self) -> Vec<(String, Result<()>)> {
        let mut tasks = JoinSet::new();
        for account in self.accounts() {
            let mailer = self.clone();
            tasks.spawn(async move {
                let result = mailer.sync_account(&account).await;
                (account, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => results.push(outcome),
                Err(err) => error!(%err, "account task did not finish"),
            }
        }
        results
    }

    /// Syncs every selectable mailbox of one account.
    ///
    /// Mailboxes are handled one after another on the account's session.
    /// A mailbox that fails for a local or protocol reason is reported and
    /// skipped; network and authentication failures end the run and drop
    /// the session. If the account is already syncing, nothing happens.
    ///
    /// # Errors
    ///
    /// The failure that ended the run.
    pub async fn sync_account(&self, account: &str) -> Result<()> {
        let email = self.account_config(account)?.email.clone();
        let Some(_guard) = self.begin_sync(&email) else {
            info!(account = %email, "already syncing; skipped");
            return Ok(());
        };

        let result = self
            .run_account(&email)
            .instrument(info_span!("sync", account = %email))
            .await;
        if let Err(err) = &result {
            error!(account = %email, %err, "account sync failed");
            self.inner.events.failed(&email, err);
            if err.is_fatal_for_account() {
                self.forget_session(&email);
            }
        }
        result
    }

    async fn run_account(&self, email: &str) -> Result<()> {
        let session = self.session(email).await?;
        let mailboxes = session.list_mailboxes().await?;
        self.inner.events.emit(SyncEvent::MailboxListChanged {
            account: email.to_string(),
            mailboxes: mailboxes.clone(),
        });

        for mailbox in &mailboxes {
            if let Err(err) = self.mirror_mailbox(&session, mailbox).await {
                if err.is_fatal_for_account() {
                    return Err(err);
                }
                warn!(mailbox, %err, "mailbox skipped");
                self.inner.events.failed(email, &err);
            }
        }
        info!(mailboxes = mailboxes.len(), "account synced");
        Ok(())
    }

    /// Syncs one mailbox of one account.
    ///
    /// # Errors
    ///
    /// Any failure; nothing is skipped.
    pub async fn sync_mailbox(&self, account: &str, mailbox: &str) -> Result<()> {
        let email = self.account_config(account)?.email.clone();
        let Some(_guard) = self.begin_sync(&email) else {
            info!(account = %email, mailbox, "already syncing; skipped");
            return Ok(());
        };

        let result = async {
            let session = self.session(&email).await?;
            self.mirror_mailbox(&session, mailbox).await
        }
        .instrument(info_span!("sync", account = %email))
        .await;
        if let Err(err) = &result {
            self.inner.events.failed(&email, err);
            if err.is_fatal_for_account() {
                self.forget_session(&email);
            }
        }
        result
    }

    async fn mirror_mailbox(
        &self,
        session: &AccountSession<C::Stream>,
        mailbox: &str,
    ) -> Result<()> {
        let email = session.email();
        let data_dir = &self.inner.data_dir;
        let maildir = Maildir::new(data_dir.mail_dir(email, mailbox));
        maildir.init()?;
        fs::create_dir_all(data_dir.cache_dir(email, mailbox))?;
        let index = session.cache(data_dir, mailbox)?;

        let mut guard = session.lock().await?;
        let status = guard.select(mailbox).await?;
        self.check_uid_validity(email, mailbox, &status, &index, &maildir)?;

        let skipped_path = data_dir.skipped_uids_path(email, mailbox);
        let mut skipped = read_skipped_uids(&skipped_path)?;
        let known = read_index(&index).known_uids();
        let mut exclude = known.clone();
        exclude.extend(skipped.iter().copied());

        let mut fetched = 0usize;
        if let Some(mut messages) = guard.fetch_delta(mailbox, &exclude).await? {
            while let Some(message) = messages.next().await? {
                if self.store_message(email, mailbox, &maildir, &index, message)? {
                    fetched += 1;
                }
            }
            if !messages.oversized().is_empty() {
                warn!(mailbox, uids = ?messages.oversized(), "messages over the size cap not mirrored");
                skipped.extend(messages.oversized());
                write_skipped_uids(&skipped_path, &skipped)?;
            }
        }
        drop(guard);

        info!(
            mailbox,
            fetched,
            skipped = skipped.len(),
            total = known.len() + fetched,
            "mailbox synced"
        );
        self.inner.events.emit(SyncEvent::MailboxSyncComplete {
            account: email.to_string(),
            mailbox: mailbox.to_string(),
        });
        Ok(())
    }

    /// Writes one fetched message to the maildir, then indexes it.
    ///
    /// Returns false for a UID that is already indexed.
    fn store_message(
        &self,
        email: &str,
        mailbox: &str,
        maildir: &Maildir,
        index: &SharedIndex,
        message: FetchedMessage,
    ) -> Result<bool> {
        let uid = message.uid.get();
        if read_index(index).contains_uid(uid) {
            debug!(mailbox, uid, "duplicate UID in FETCH; keeping the first");
            return Ok(false);
        }

        let mut writer = maildir.create()?;
        writer.write_all(&message.header)?;
        writer.write_all(&message.text)?;
        let key = writer.close()?;

        let entry = CacheData::new(message.envelope.into(), uid, key);
        write_index(index).append(entry)?;
        debug!(mailbox, uid, "stored message");
        self.inner.events.index_changed(email, mailbox);
        Ok(true)
    }

    /// Empties the mailbox's mirror when the server's UIDVALIDITY no longer
    /// matches the stored one, so every message is fetched again. Skipped
    /// UIDs are forgotten too.
    fn check_uid_validity(
        &self,
        email: &str,
        mailbox: &str,
        status: &MailboxStatus,
        index: &SharedIndex,
        maildir: &Maildir,
    ) -> Result<()> {
        let Some(current) = status.uid_validity.map(UidValidity::get) else {
            return Ok(());
        };
        let path = self.inner.data_dir.uid_validity_path(email, mailbox);

        match read_uid_validity(&path)? {
            Some(stored) if stored == current => return Ok(()),
            Some(stored) => {
                warn!(mailbox, stored, current, "UIDVALIDITY changed; discarding local copy");
                let removed = write_index(index).clear()?;
                for entry in &removed {
                    maildir.delete(&entry.filename)?;
                }
                if !removed.is_empty() {
                    self.inner.events.index_changed(email, mailbox);
                }
                write_skipped_uids(
                    &self.inner.data_dir.skipped_uids_path(email, mailbox),
                    &BTreeSet::new(),
                )?;
            }
            None => {}
        }
        write_uid_validity(&path, current)
    }
}
