//! XOAUTH2 SASL support.
//!
//! The client's first message is
//! `user=<email>\x01auth=Bearer <token>\x01\x01`, base64 encoded and sent
//! inline with `AUTHENTICATE XOAUTH2`. When the token is refused, Google and
//! Microsoft answer with a continuation whose payload is a JSON object such
//! as `{"status":"401","schemes":"Bearer","scope":"https://mail.google.com/"}`,
//! usually base64 encoded. The client must reply with an empty line before
//! the server sends the tagged NO.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

/// Builds the raw XOAUTH2 initial client response (before base64).
#[must_use]
pub fn xoauth2_payload(user: &str, access_token: &str) -> String {
    format!("user={user}\x01auth=Bearer {access_token}\x01\x01")
}

/// Builds the base64 XOAUTH2 initial client response.
#[must_use]
pub fn xoauth2_response(user: &str, access_token: &str) -> String {
    STANDARD.encode(xoauth2_payload(user, access_token).as_bytes())
}

/// Structured error carried by an XOAUTH2 failure challenge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthError {
    /// HTTP-like status code, e.g. `"401"`.
    pub status: String,
    /// Accepted authentication schemes.
    #[serde(default)]
    pub schemes: String,
    /// Scope the token must carry, when the server names one.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Interprets a non-empty continuation payload as an XOAUTH2 error.
///
/// The payload is tried as base64 first and falls back to the raw text, so
/// servers that send the JSON unencoded are understood too. Returns `None`
/// when neither form holds a JSON error object.
#[must_use]
pub fn parse_challenge(challenge: &str) -> Option<OAuthError> {
    let trimmed = challenge.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(decoded) = STANDARD.decode(trimmed)
        && let Ok(err) = serde_json::from_slice::<OAuthError>(&decoded)
    {
        return Some(err);
    }

    serde_json::from_str(trimmed).ok()
}
