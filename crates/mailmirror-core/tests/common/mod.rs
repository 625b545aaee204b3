//! Scripted servers and a throwaway data directory.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeSet, VecDeque};
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mailmirror_core::{
    AccountConfig, CacheData, CacheIndex, Connector, DataDir, Envelope, EventSink, Mailer,
    Maildir, Provider, Settings, SyncEvent, Token, account::save_token, cache::write_uid_validity,
};
use mailmirror_imap::Config;
use mailmirror_imap::sasl::xoauth2_response;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_test::io::{Builder, Mock};

pub const EMAIL: &str = "me@example.com";
pub const TOKEN: &str = "tok";
pub const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 AUTH=XOAUTH2 SASL-IR] ready\r\n";

/// Hands out one scripted stream per dial.
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Mock>>,
    dials: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(scripts: impl IntoIterator<Item = Mock>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            dials: AtomicUsize::new(0),
        }
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    type Stream = Mock;

    async fn connect(&self, _config: &Config) -> mailmirror_imap::Result<Mock> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        script.ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no script").into())
    }
}

/// A data directory with one account and a valid token.
pub struct Fixture {
    pub dir: TempDir,
    pub data_dir: DataDir,
    pub settings: Settings,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data_dir = DataDir::new(dir.path());
        let mut settings = Settings::default();
        settings.upsert_account(AccountConfig::new(EMAIL).with_host("imap.example.com"));
        save_token(&data_dir, EMAIL, Provider::Generic, &Token::new(TOKEN, "Bearer")).unwrap();
        Self {
            dir,
            data_dir,
            settings,
        }
    }

    pub fn mailer(
        &self,
        scripts: impl IntoIterator<Item = Mock>,
    ) -> (Mailer<ScriptedConnector>, UnboundedReceiver<SyncEvent>) {
        let (events, rx) = EventSink::channel();
        let mailer = Mailer::new(
            self.data_dir.clone(),
            self.settings.clone(),
            ScriptedConnector::new(scripts),
            events,
        );
        (mailer, rx)
    }

    /// Seeds a mailbox with delivered files and matching index entries.
    pub fn seed(&self, mailbox: &str, messages: &[(u32, &str)]) {
        let maildir = self.data_dir.mail_dir(EMAIL, mailbox);
        for sub in ["tmp", "new", "cur"] {
            std::fs::create_dir_all(maildir.join(sub)).unwrap();
        }
        let mut index = CacheIndex::empty(self.data_dir.cache_index_path(EMAIL, mailbox));
        for &(uid, key) in messages {
            std::fs::write(maildir.join("new").join(key), format!("Subject: {uid}\r\n\r\nbody\r\n"))
                .unwrap();
            index
                .append(CacheData::new(Envelope::default(), uid, key))
                .unwrap();
        }
    }

    /// Gives a seeded message server flags, renaming its file into `cur/`.
    pub fn set_seeded_flags(&self, mailbox: &str, uid: u32, key: &str, flags: &[&str]) {
        Maildir::new(self.data_dir.mail_dir(EMAIL, mailbox))
            .set_flags(key, flags.iter().copied())
            .unwrap();
        let flags: BTreeSet<String> = flags.iter().map(ToString::to_string).collect();
        assert!(self.index(mailbox).update_flags(uid, flags).unwrap());
    }

    /// Records the UIDVALIDITY a mailbox was mirrored under.
    pub fn seed_uid_validity(&self, mailbox: &str, value: u32) {
        let path = self.data_dir.uid_validity_path(EMAIL, mailbox);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_uid_validity(&path, value).unwrap();
    }

    pub fn index(&self, mailbox: &str) -> CacheIndex {
        CacheIndex::load(self.data_dir.cache_index_path(EMAIL, mailbox)).unwrap()
    }

    pub fn files(&self, mailbox: &str, sub: &str) -> Vec<String> {
        let dir = self.data_dir.mail_dir(EMAIL, mailbox).join(sub);
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }
}

/// Greeting, XOAUTH2 and CAPABILITY, using tags A0000 and A0001.
pub fn signed_in(capabilities: &str) -> Builder {
    let mut builder = Builder::new();
    builder
        .read(GREETING)
        .write(format!("A0000 AUTHENTICATE XOAUTH2 {}\r\n", xoauth2_response(EMAIL, TOKEN)).as_bytes())
        .read(b"A0000 OK authenticated\r\n")
        .write(b"A0001 CAPABILITY\r\n")
        .read(format!("* CAPABILITY IMAP4rev1 {capabilities}\r\n").as_bytes())
        .read(b"A0001 OK done\r\n");
    builder
}

/// An untagged FETCH carrying envelope, UID, header and text.
pub fn fetch_line(seq: u32, uid: u32) -> Vec<u8> {
    let header = format!("Subject: message {uid}\r\nMessage-ID: <{uid}@example.com>\r\n\r\n");
    let text = format!("body of {uid}\r\n");
    format!(
        "* {seq} FETCH (UID {uid} ENVELOPE (\"Tue, 14 Nov 2023 22:13:20 +0000\" \"message {uid}\" \
         ((\"Alice\" NIL \"alice\" \"example.com\")) NIL NIL NIL NIL NIL NIL \"<{uid}@example.com>\") \
         BODY[HEADER] {{{}}}\r\n{header} BODY[TEXT] {{{}}}\r\n{text})\r\n",
        header.len(),
        text.len()
    )
    .into_bytes()
}

/// The full message bytes `fetch_line` delivers.
pub fn raw_message(uid: u32) -> Vec<u8> {
    format!("Subject: message {uid}\r\nMessage-ID: <{uid}@example.com>\r\n\r\nbody of {uid}\r\n")
        .into_bytes()
}

pub fn drain(rx: &mut UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn index_changed(mailbox: &str) -> SyncEvent {
    SyncEvent::MailboxIndexChanged {
        account: EMAIL.to_string(),
        mailbox: mailbox.to_string(),
    }
}

pub fn sync_complete(mailbox: &str) -> SyncEvent {
    SyncEvent::MailboxSyncComplete {
        account: EMAIL.to_string(),
        mailbox: mailbox.to_string(),
    }
}
