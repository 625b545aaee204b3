//! Command-line arguments.

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mailmirror", version, about = "Offline mirror of IMAP mailboxes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage configured accounts.
    Accounts(AccountsCmd),
    #[command(flatten)]
    Mail(MailCommand),
}

/// Commands that go through the mailer.
#[derive(Subcommand, Debug)]
pub enum MailCommand {
    /// Mirror new mail from the server.
    Sync(SyncCmd),
    /// List the mirrored messages of a mailbox, newest first.
    List(ListCmd),
    /// Print the raw bytes of a mirrored message.
    Read(MessageRef),
    /// Mark a message read, or unread with `--unread`.
    MarkRead {
        #[command(flatten)]
        message: MessageRef,
        #[arg(long)]
        unread: bool,
    },
    /// Flag a message, or unflag it with `--clear`.
    Flag {
        #[command(flatten)]
        message: MessageRef,
        #[arg(long)]
        clear: bool,
    },
    /// Move a message to another mailbox.
    Move {
        #[command(flatten)]
        message: MessageRef,
        /// Destination mailbox.
        target: String,
    },
    /// Delete maildir files no index entry refers to.
    Gc { account: String, mailbox: String },
}

#[derive(Args, Debug)]
pub struct AccountsCmd {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountsCommand {
    /// Add or update an account.
    Add {
        email: String,
        /// google, microsoft, yahoo or generic; guessed from the address
        /// when omitted.
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Remove an account from the settings. Mirrored mail is kept.
    Remove { email: String },
    /// Show configured accounts.
    List,
    /// Store an OAuth access token for an account.
    Token {
        email: String,
        access_token: String,
        /// Seconds until the token expires.
        #[arg(long)]
        expires_in: Option<i64>,
    },
}

#[derive(Args, Debug)]
pub struct SyncCmd {
    /// Only this account.
    #[arg(long)]
    pub account: Option<String>,
    /// Only this mailbox; needs `--account`.
    #[arg(long, requires = "account")]
    pub mailbox: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListCmd {
    pub account: String,
    #[arg(default_value = "INBOX")]
    pub mailbox: String,
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
    /// Only unread messages.
    #[arg(long)]
    pub unread: bool,
}

#[derive(Args, Debug)]
pub struct MessageRef {
    pub account: String,
    pub mailbox: String,
    pub uid: u32,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mailbox_sync_needs_an_account() {
        assert!(Cli::try_parse_from(["mailmirror", "sync", "--mailbox", "INBOX"]).is_err());
        assert!(
            Cli::try_parse_from(["mailmirror", "sync", "--account", "a@b.c", "--mailbox", "INBOX"])
                .is_ok()
        );
    }

    #[test]
    fn list_defaults_to_inbox() {
        let cli = Cli::try_parse_from(["mailmirror", "list", "me@example.com"]).unwrap_or_else(|e| {
            panic!("{e}");
        });
        let Command::Mail(MailCommand::List(list)) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.mailbox, "INBOX");
        assert_eq!(list.limit, 50);
    }
}
