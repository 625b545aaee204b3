//! Filesystem-safe tokens for account and mailbox names.
//!
//! Names are encoded as RFC 4648 base32 (standard alphabet, no padding) of
//! their UTF-8 bytes. The output only uses `A-Z` and `2-7`, so it survives
//! case-insensitive filesystems and never contains a path separator.

use data_encoding::BASE32_NOPAD;

use crate::error::{Error, Result};

/// Encodes a name as an unpadded base32 token.
#[must_use]
pub fn encode(name: &str) -> String {
    BASE32_NOPAD.encode(name.as_bytes())
}

/// Decodes a token produced by [`encode`].
///
/// # Errors
///
/// Returns [`Error::Encoding`] if the token is not unpadded base32 or does
/// not decode to UTF-8.
pub fn decode(token: &str) -> Result<String> {
    let bytes = BASE32_NOPAD
        .decode(token.as_bytes())
        .map_err(|e| Error::Encoding(format!("{token:?}: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::Encoding(format!("{token:?}: {e}")))
}
