//! `mailmirror`: keep an offline copy of IMAP mailboxes.

mod cli;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use mailmirror_core::{
    AccountConfig, CacheData, DataDir, EventSink, Mailer, Settings, SyncEvent, TlsConnector,
    Token, save_token,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{AccountsCommand, Cli, Command, ListCmd, MailCommand, MessageRef, SyncCmd};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailmirror=info,mailmirror_core=info,mailmirror_imap=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings_path = Settings::default_path()?;
    let settings = Settings::load(&settings_path)?;
    let data_dir = DataDir::from_env()?;

    match cli.command {
        Command::Accounts(accounts) => {
            run_accounts(accounts.command, settings, &settings_path, &data_dir)
        }
        Command::Mail(command) => {
            let (events, rx) = EventSink::channel();
            let mailer = Mailer::new(data_dir, settings, TlsConnector, events);
            let result = run(&mailer, command).await;
            mailer.shutdown().await;
            report_events(rx);
            result
        }
    }
}

fn run_accounts(
    command: AccountsCommand,
    mut settings: Settings,
    settings_path: &Path,
    data_dir: &DataDir,
) -> Result<()> {
    match command {
        AccountsCommand::Add {
            email,
            provider,
            host,
            port,
        } => {
            let mut account = AccountConfig::new(&email);
            if let Some(provider) = provider {
                account = account.with_provider(provider.parse()?);
            }
            if let Some(host) = host {
                account = account.with_host(host);
            }
            if let Some(port) = port {
                account = account.with_port(port);
            }
            // Fails early when no host can be worked out.
            account.imap_config(settings.idle_timeout())?;
            settings.upsert_account(account);
            settings.save(settings_path)?;
            info!(account = %email, "account saved");
        }
        AccountsCommand::Remove { email } => {
            if !settings.remove_account(&email) {
                bail!("no account {email}");
            }
            settings.save(settings_path)?;
            info!(account = %email, "account removed");
        }
        AccountsCommand::List => {
            let mut out = std::io::stdout().lock();
            for account in &settings.accounts {
                let provider = account.provider();
                let host = account
                    .host
                    .as_deref()
                    .or_else(|| provider.default_host())
                    .unwrap_or("-");
                writeln!(out, "{}\t{provider}\t{host}", account.email)?;
            }
        }
        AccountsCommand::Token {
            email,
            access_token,
            expires_in,
        } => {
            let account = settings
                .account(&email)
                .with_context(|| format!("no account {email}"))?;
            let mut token = Token::new(access_token, "Bearer");
            if let Some(secs) = expires_in {
                token = token.with_expires_at(expiry(Utc::now(), secs)?);
            }
            save_token(data_dir, &account.email, account.provider(), &token)?;
            info!(account = %account.email, "token stored");
        }
    }
    Ok(())
}

/// `now` plus `secs` seconds, refusing values chrono cannot represent.
fn expiry(now: DateTime<Utc>, secs: i64) -> Result<DateTime<Utc>> {
    Duration::try_seconds(secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .with_context(|| format!("--expires-in {secs} is out of range"))
}

async fn run(mailer: &Mailer<TlsConnector>, command: MailCommand) -> Result<()> {
    match command {
        MailCommand::Sync(sync) => run_sync(mailer, sync).await,
        MailCommand::List(list) => {
            print_list(mailer, &list)?;
            Ok(())
        }
        MailCommand::Read(message) => {
            let bytes = mailer.read_message(&message.account, &message.mailbox, message.uid)?;
            std::io::stdout().lock().write_all(&bytes)?;
            Ok(())
        }
        MailCommand::MarkRead { message, unread } => {
            let MessageRef {
                account,
                mailbox,
                uid,
            } = message;
            mailer.mark_read(&account, &mailbox, uid, !unread).await??;
            Ok(())
        }
        MailCommand::Flag { message, clear } => {
            let MessageRef {
                account,
                mailbox,
                uid,
            } = message;
            mailer.mark_flagged(&account, &mailbox, uid, !clear).await??;
            Ok(())
        }
        MailCommand::Move { message, target } => {
            let MessageRef {
                account,
                mailbox,
                uid,
            } = message;
            mailer.move_message(&account, &mailbox, uid, &target).await??;
            Ok(())
        }
        MailCommand::Gc { account, mailbox } => {
            let removed = mailer.reconcile_orphans(&account, &mailbox)?;
            println!("removed {} orphaned file(s)", removed.len());
            Ok(())
        }
    }
}

async fn run_sync(mailer: &Mailer<TlsConnector>, sync: SyncCmd) -> Result<()> {
    match (sync.account, sync.mailbox) {
        (Some(account), Some(mailbox)) => Ok(mailer.sync_mailbox(&account, &mailbox).await?),
        (Some(account), None) => Ok(mailer.sync_account(&account).await?),
        (None, _) => {
            if mailer.accounts().is_empty() {
                bail!("no accounts configured; add one with `mailmirror accounts add`");
            }
            let failed = mailer
                .sync_all()
                .await
                .into_iter()
                .filter(|(_, result)| result.is_err())
                .count();
            if failed > 0 {
                bail!("{failed} account(s) failed to sync");
            }
            Ok(())
        }
    }
}

fn print_list(mailer: &Mailer<TlsConnector>, list: &ListCmd) -> Result<()> {
    let mut out = std::io::stdout().lock();
    let messages = mailer
        .snapshot_by_date(&list.account, &list.mailbox)
        .into_iter()
        .filter(|m| !list.unread || !m.is_seen())
        .take(list.limit);
    for message in messages {
        writeln!(out, "{}", summary_line(&message))?;
    }
    Ok(())
}

fn summary_line(message: &CacheData) -> String {
    let envelope = &message.envelope;
    let marks = format!(
        "{}{}",
        if message.is_seen() { ' ' } else { 'N' },
        if message.is_flagged() { '!' } else { ' ' }
    );
    let date = envelope
        .parsed_date()
        .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string());
    let from = envelope.from.first().map_or("-", |a| {
        if a.name.is_empty() {
            a.address.as_str()
        } else {
            a.name.as_str()
        }
    });
    let subject = envelope.subject.as_deref().unwrap_or("(no subject)");
    format!("{:>8} {marks} {date:<16} {from:<24} {subject}", message.uid)
}

fn report_events(mut rx: UnboundedReceiver<SyncEvent>) {
    let mut mailboxes = 0usize;
    while let Ok(event) = rx.try_recv() {
        match event {
            SyncEvent::MailboxSyncComplete { .. } => mailboxes += 1,
            SyncEvent::SyncFailed {
                account,
                kind,
                message,
            } => eprintln!("{account}: {kind:?}: {message}"),
            SyncEvent::MailboxListChanged { .. } | SyncEvent::MailboxIndexChanged { .. } => {}
        }
    }
    if mailboxes > 0 {
        info!(mailboxes, "sync finished");
    }
}
