//! OAuth2 access tokens left on disk by the external sign-in flow.

use std::fs;
use std::io;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Provider;
use crate::error::{Error, Result};
use crate::fs::write_atomic;
use crate::layout::DataDir;

/// `OAuth2` access token with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiration time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token, used only by the sign-in flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope granted by authorization server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(60) >= exp)
    }
}

/// Reads the usable access token of an account.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the token file is missing, unreadable as a
/// token, or expired, and [`Error::Io`] if it cannot be read.
pub fn load_token(data_dir: &DataDir, email: &str, provider: Provider) -> Result<Token> {
    let path = data_dir.token_path(email, provider.as_str());
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::Auth(format!(
                "no {provider} token for {email}; sign in first"
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let token: Token = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Auth(format!("unreadable token {}: {e}", path.display())))?;
    if token.is_expired() {
        return Err(Error::Auth(format!("{provider} token for {email} has expired")));
    }
    Ok(token)
}

/// Stores a token where [`load_token`] finds it.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be written.
pub fn save_token(data_dir: &DataDir, email: &str, provider: Provider, token: &Token) -> Result<()> {
    let path = data_dir.token_path(email, provider.as_str());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(token).map_err(|e| Error::Config(e.to_string()))?;
    write_atomic(&path, &json)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn expiry_uses_buffer() {
        let token = Token::new("t", "Bearer");
        assert!(!token.is_expired());
        assert!(
            token
                .clone()
                .with_expires_at(Utc::now() + Duration::seconds(30))
                .is_expired()
        );
        assert!(
            !token
                .with_expires_at(Utc::now() + Duration::hours(1))
                .is_expired()
        );
    }

    #[test]
    fn missing_token_is_auth_error() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());
        let err = load_token(&data, "me@gmail.com", Provider::Google).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn saved_token_is_loaded() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());
        let token = Token::new("ya29.abc", "Bearer").with_expires_at(Utc::now() + Duration::hours(1));
        save_token(&data, "me@gmail.com", Provider::Google, &token).unwrap();

        assert!(data.token_path("me@gmail.com", "google").exists());
        assert_eq!(load_token(&data, "me@gmail.com", Provider::Google).unwrap(), token);
    }

    #[test]
    fn expired_token_is_auth_error() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());
        let token = Token::new("old", "Bearer").with_expires_at(Utc::now() - Duration::hours(1));
        save_token(&data, "me@gmail.com", Provider::Google, &token).unwrap();

        let err = load_token(&data, "me@gmail.com", Provider::Google).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn minimal_token_file() {
        let token: Token =
            serde_json::from_str(r#"{"access_token":"a","token_type":"Bearer"}"#).unwrap();
        assert_eq!(token, Token::new("a", "Bearer"));
    }
}
