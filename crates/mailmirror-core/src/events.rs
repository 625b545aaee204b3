//! Notifications from background tasks.
//!
//! Events go out through an unbounded channel, so emitting never waits on
//! whoever consumes them.

use tokio::sync::mpsc;

use crate::error::{Error, ErrorKind};

/// Something observable changed, or a background task failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The account's mailbox list was refreshed.
    MailboxListChanged {
        /// Account address.
        account: String,
        /// Selectable mailbox names.
        mailboxes: Vec<String>,
    },
    /// A mailbox's index gained or lost an entry, or an entry's flags
    /// changed.
    MailboxIndexChanged {
        /// Account address.
        account: String,
        /// Mailbox name.
        mailbox: String,
    },
    /// A mailbox finished syncing.
    MailboxSyncComplete {
        /// Account address.
        account: String,
        /// Mailbox name.
        mailbox: String,
    },
    /// A sync or mutation failed.
    SyncFailed {
        /// Account address.
        account: String,
        /// Error classification.
        kind: ErrorKind,
        /// Human-readable error.
        message: String,
    },
}

impl SyncEvent {
    /// Account the event concerns.
    #[must_use]
    pub fn account(&self) -> &str {
        match self {
            Self::MailboxListChanged { account, .. }
            | Self::MailboxIndexChanged { account, .. }
            | Self::MailboxSyncComplete { account, .. }
            | Self::SyncFailed { account, .. } => account,
        }
    }
}

/// Sending half of the event queue.
///
/// A sink without a receiver, or whose receiver was dropped, discards
/// events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl EventSink {
    /// Creates a connected sink and its receiver.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emits an event.
    pub fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.tx
            && tx.send(event).is_err()
        {
            tracing::trace!("event receiver dropped");
        }
    }

    pub(crate) fn index_changed(&self, account: &str, mailbox: &str) {
        self.emit(SyncEvent::MailboxIndexChanged {
            account: account.to_string(),
            mailbox: mailbox.to_string(),
        });
    }

    pub(crate) fn failed(&self, account: &str, err: &Error) {
        self.emit(SyncEvent::SyncFailed {
            account: account.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn events_are_delivered_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.index_changed("me@example.com", "INBOX");
        sink.failed("me@example.com", &Error::Protocol("no".into()));

        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::MailboxIndexChanged {
                account: "me@example.com".into(),
                mailbox: "INBOX".into()
            }
        );
        let failed = rx.try_recv().unwrap();
        assert_eq!(failed.account(), "me@example.com");
        assert!(matches!(
            failed,
            SyncEvent::SyncFailed { kind: ErrorKind::Protocol, .. }
        ));
    }

    #[test]
    fn closed_or_disabled_sinks_do_not_fail() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.index_changed("a", "b");
        EventSink::disabled().index_changed("a", "b");
    }
}
