//! Streaming UID FETCH results.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::client::Client;
use super::framed::is_tagged;
use crate::parser::{Envelope, FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{Flags, SeqNum, Status, Uid};
use crate::{Error, Result};

/// One message from a UID FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number at fetch time.
    pub seq: SeqNum,
    /// UID.
    pub uid: Uid,
    /// Envelope, empty when not requested.
    pub envelope: Envelope,
    /// Flags, empty when not requested.
    pub flags: Flags,
    /// `BODY[HEADER]` bytes.
    pub header: Vec<u8>,
    /// `BODY[TEXT]` bytes.
    pub text: Vec<u8>,
}

impl FetchedMessage {
    /// Assembles a message from FETCH items. Returns `None` when the UID or
    /// both body sections are missing, which happens for unsolicited flag
    /// updates interleaved with the FETCH.
    #[must_use]
    pub fn from_items(seq: SeqNum, items: Vec<FetchItem>) -> Option<Self> {
        let mut uid = None;
        let mut envelope = Envelope::default();
        let mut flags = Flags::new();
        let mut header = None;
        let mut text = None;

        for item in items {
            match item {
                FetchItem::Uid(u) => uid = Some(u),
                FetchItem::Envelope(env) => envelope = *env,
                FetchItem::Flags(f) => flags = f,
                FetchItem::Body {
                    section: Some(section),
                    data,
                    ..
                } => {
                    if section.eq_ignore_ascii_case("HEADER") {
                        header = Some(data.unwrap_or_default());
                    } else if section.eq_ignore_ascii_case("TEXT") {
                        text = Some(data.unwrap_or_default());
                    }
                }
                FetchItem::Body { section: None, .. } => {}
            }
        }

        if header.is_none() && text.is_none() {
            return None;
        }
        Some(Self {
            seq,
            uid: uid?,
            envelope,
            flags,
            header: header.unwrap_or_default(),
            text: text.unwrap_or_default(),
        })
    }

    /// Header and text joined: the full RFC 822 message.
    #[must_use]
    pub fn raw(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.header.len() + self.text.len());
        raw.extend_from_slice(&self.header);
        raw.extend_from_slice(&self.text);
        raw
    }
}

/// Messages of an in-flight UID FETCH, yielded as each response arrives so
/// large mailboxes never sit in memory at once.
pub struct FetchStream<'a, S> {
    client: &'a mut Client<S>,
    tag: String,
    done: bool,
    oversized: Vec<u32>,
}

impl<'a, S> FetchStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(super) fn new(client: &'a mut Client<S>, tag: String) -> Self {
        Self {
            client,
            tag,
            done: false,
            oversized: Vec::new(),
        }
    }

    /// UIDs skipped so far because a body section exceeded the literal
    /// size cap.
    #[must_use]
    pub fn oversized(&self) -> &[u32] {
        &self.oversized
    }

    /// Returns the next message, or `None` once the FETCH completed.
    ///
    /// Responses that do not parse, or that lack a UID or body, are logged
    /// and skipped. So are messages whose body went over the literal size
    /// cap; their UIDs are collected in [`oversized`](Self::oversized).
    /// A NO/BAD completion or an untagged BYE is an error.
    ///
    /// # Errors
    ///
    /// Transport failures, BYE, or a failed completion.
    pub async fn next(&mut self) -> Result<Option<FetchedMessage>> {
        while !self.done {
            let raw = self.client.stream.read_response().await?;
            let truncated = self.client.stream.dropped_literals() > 0;

            if is_tagged(&raw, &self.tag) {
                self.finish();
                return match ResponseParser::parse(&raw)? {
                    Response::Tagged { status, text, .. } => match status {
                        Status::Ok | Status::PreAuth => Ok(None),
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                    },
                    other => Err(Error::Protocol(format!(
                        "expected FETCH completion, got {other:?}"
                    ))),
                };
            }

            match ResponseParser::parse(&raw) {
                Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) if truncated => {
                    let uid = items.iter().find_map(|item| match item {
                        FetchItem::Uid(uid) => Some(uid.get()),
                        _ => None,
                    });
                    warn!(seq = seq.get(), ?uid, "skipping message over the size cap");
                    self.oversized.extend(uid);
                }
                Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) => {
                    if let Some(message) = FetchedMessage::from_items(seq, items) {
                        return Ok(Some(message));
                    }
                    debug!(seq = seq.get(), "FETCH without UID or body");
                }
                Ok(Response::Untagged(UntaggedResponse::Bye { text, .. })) => {
                    self.finish();
                    return Err(Error::Bye(text));
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "skipping unparsable FETCH response"),
            }
        }
        Ok(None)
    }

    /// Reads and discards the rest of the FETCH.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next).
    pub async fn drain(mut self) -> Result<()> {
        while self.next().await?.is_some() {}
        Ok(())
    }

    fn finish(&mut self) {
        self.done = true;
        self.client.pending = None;
    }
}
