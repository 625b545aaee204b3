//! Settings file and per-account server configuration.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::write_atomic;

/// Default network idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Mail provider, which decides the token file name and default host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Gmail and Google Workspace.
    Google,
    /// Outlook.com and Microsoft 365.
    Microsoft,
    /// Yahoo Mail.
    Yahoo,
    /// Any other XOAUTH2 server; needs an explicit host.
    Generic,
}

impl Provider {
    /// Guesses the provider from an address's domain.
    #[must_use]
    pub fn from_email(email: &str) -> Self {
        let domain = email
            .rsplit_once('@')
            .map(|(_, d)| d.to_ascii_lowercase())
            .unwrap_or_default();
        match domain.as_str() {
            "gmail.com" | "googlemail.com" => Self::Google,
            "outlook.com" | "hotmail.com" | "live.com" | "office365.com" => Self::Microsoft,
            "yahoo.com" => Self::Yahoo,
            _ => Self::Generic,
        }
    }

    /// Name used in token file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
            Self::Yahoo => "yahoo",
            Self::Generic => "generic",
        }
    }

    /// IMAP host of the provider, if it has a well-known one.
    #[must_use]
    pub const fn default_host(self) -> Option<&'static str> {
        match self {
            Self::Google => Some("imap.gmail.com"),
            Self::Microsoft => Some("outlook.office365.com"),
            Self::Yahoo => Some("imap.mail.yahoo.com"),
            Self::Generic => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "microsoft" => Ok(Self::Microsoft),
            "yahoo" => Ok(Self::Yahoo),
            "generic" => Ok(Self::Generic),
            other => Err(Error::Config(format!("unknown provider {other:?}"))),
        }
    }
}

/// One configured account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Email address, also the IMAP user name.
    pub email: String,
    /// Provider; guessed from the address when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    /// IMAP host; the provider's host when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// IMAP port; 993 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl AccountConfig {
    /// Account with everything derived from the address.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            provider: None,
            host: None,
            port: None,
        }
    }

    /// Sets the provider.
    #[must_use]
    pub const fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the IMAP host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the IMAP port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Effective provider.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
            .unwrap_or_else(|| Provider::from_email(&self.email))
    }

    /// Connection settings for this account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no host is configured and the provider
    /// has no default.
    pub fn imap_config(&self, io_timeout: Duration) -> Result<mailmirror_imap::Config> {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => self
                .provider()
                .default_host()
                .ok_or_else(|| Error::Config(format!("{}: no IMAP host configured", self.email)))?
                .to_string(),
        };
        Ok(mailmirror_imap::Config::new(host)
            .with_port(self.port.unwrap_or(mailmirror_imap::connection::IMAPS_PORT))
            .with_io_timeout(io_timeout))
    }
}

const fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

const fn default_max_message_size() -> usize {
    mailmirror_imap::connection::MAX_LITERAL_SIZE
}

/// Process-wide settings, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Configured accounts.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    /// Seconds without data before a connection is abandoned.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Largest header or body part, in bytes, that is mirrored. Messages
    /// with a bigger part are skipped.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_message_size: default_max_message_size(),
        }
    }
}

impl Settings {
    /// `<config dir>/mailmirror/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the platform has no config directory.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("mailmirror").join("settings.json"))
            .ok_or_else(|| Error::Config("no configuration directory".into()))
    }

    /// Loads settings; a missing file gives the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid JSON and [`Error::Io`] if the
    /// file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes settings atomically, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }

    /// Network idle timeout.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// The account with this address, compared case-insensitively.
    #[must_use]
    pub fn account(&self, email: &str) -> Option<&AccountConfig> {
        self.accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
    }

    /// Adds an account, replacing one with the same address.
    pub fn upsert_account(&mut self, account: AccountConfig) {
        match self
            .accounts
            .iter_mut()
            .find(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
    }

    /// Removes an account. Returns false if it was not configured.
    pub fn remove_account(&mut self, email: &str) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| !a.email.eq_ignore_ascii_case(email));
        self.accounts.len() != before
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn provider_detection() {
        assert_eq!(Provider::from_email("me@gmail.com"), Provider::Google);
        assert_eq!(Provider::from_email("me@GoogleMail.com"), Provider::Google);
        assert_eq!(Provider::from_email("me@hotmail.com"), Provider::Microsoft);
        assert_eq!(Provider::from_email("me@office365.com"), Provider::Microsoft);
        assert_eq!(Provider::from_email("me@yahoo.com"), Provider::Yahoo);
        assert_eq!(Provider::from_email("me@example.com"), Provider::Generic);
        assert_eq!(Provider::from_email("nobody"), Provider::Generic);
        assert_eq!("Google".parse::<Provider>().unwrap(), Provider::Google);
        assert!("aol".parse::<Provider>().is_err());
    }

    #[test]
    fn imap_config_resolution() {
        let timeout = Duration::from_secs(10);
        let gmail = AccountConfig::new("me@gmail.com").imap_config(timeout).unwrap();
        assert_eq!(gmail.host, "imap.gmail.com");
        assert_eq!(gmail.port, 993);
        assert_eq!(gmail.io_timeout, timeout);

        let custom = AccountConfig::new("me@example.com")
            .with_host("mail.example.com")
            .with_port(1993)
            .imap_config(timeout)
            .unwrap();
        assert_eq!(custom.host, "mail.example.com");
        assert_eq!(custom.port, 1993);

        assert!(matches!(
            AccountConfig::new("me@example.com").imap_config(timeout),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn load_missing_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert!(settings.accounts.is_empty());
        assert_eq!(settings.idle_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mailmirror").join("settings.json");

        let mut settings = Settings::default();
        settings.upsert_account(AccountConfig::new("me@gmail.com"));
        settings.upsert_account(
            AccountConfig::new("ops@example.com")
                .with_provider(Provider::Generic)
                .with_host("imap.example.com"),
        );
        settings.upsert_account(AccountConfig::new("ME@gmail.com").with_port(993));
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.accounts.len(), 2);
        assert_eq!(loaded.account("me@gmail.com").unwrap().port, Some(993));

        let json = fs::read_to_string(&path).unwrap();
        assert!(!json.contains("\"host\": null"));
    }

    #[test]
    fn remove_account() {
        let mut settings = Settings::default();
        settings.upsert_account(AccountConfig::new("me@gmail.com"));
        assert!(settings.remove_account("Me@Gmail.com"));
        assert!(!settings.remove_account("me@gmail.com"));
    }

    #[test]
    fn invalid_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn sparse_settings_use_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"accounts":[{"email":"me@gmail.com"}]}"#).unwrap();
        assert_eq!(settings.idle_timeout_secs, 30);
        assert_eq!(settings.max_message_size, 100 * 1024 * 1024);
        assert_eq!(settings.accounts[0].provider(), Provider::Google);
    }
}
