//! IMAP client connection.
//!
//! The connection state (not authenticated, authenticated, selected) is
//! tracked at runtime: the session owning a client is shared behind a
//! mutex and moves between mailboxes, so the state cannot live in the type.
//! Commands that need a selected mailbox fail with
//! [`Error::InvalidState`] otherwise.

#![allow(clippy::missing_errors_doc)]

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::fetch_stream::FetchStream;
use super::framed::{FramedStream, is_tagged};
use super::Config;
use crate::command::{Command, FetchAttribute, SearchCriteria, StoreAction, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::sasl::{parse_challenge, xoauth2_response};
use crate::types::{
    Capability, ListResponse, MailboxStatus, ResponseCode, Status, UidSet, UidValidity,
};
use crate::{Error, Result};

/// IMAP client connection.
pub struct Client<S> {
    pub(super) stream: FramedStream<S>,
    tags: TagGenerator,
    capabilities: Vec<Capability>,
    selected: Option<String>,
    selected_uid_validity: Option<UidValidity>,
    /// Tag of a FETCH whose stream was dropped before completion.
    pub(super) pending: Option<String>,
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("capabilities", &self.capabilities)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the server greeting from a connected stream.
    ///
    /// Capabilities announced in the greeting are recorded. A BYE greeting
    /// is returned as [`Error::Bye`].
    pub async fn from_stream(stream: S, config: &Config) -> Result<Self> {
        let mut framed = FramedStream::with_timeout(stream, config.io_timeout)
            .with_max_literal_size(config.max_literal_size);
        let greeting = framed.read_response().await?;

        let mut capabilities = Vec::new();
        match ResponseParser::parse(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => {
                if let Some(ResponseCode::Capability(caps)) = code {
                    capabilities = caps;
                }
            }
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self {
            stream: framed,
            tags: TagGenerator::default(),
            capabilities,
            selected: None,
            selected_uid_validity: None,
            pending: None,
        })
    }

    /// Capabilities seen so far.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks for a capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// MOVE (RFC 6851).
    #[must_use]
    pub fn supports_move(&self) -> bool {
        self.has_capability(&Capability::Move)
    }

    /// UIDPLUS (RFC 4315).
    #[must_use]
    pub fn supports_uidplus(&self) -> bool {
        self.has_capability(&Capability::UidPlus)
    }

    /// LIST-EXTENDED (RFC 5258).
    #[must_use]
    pub fn supports_list_extended(&self) -> bool {
        self.has_capability(&Capability::ListExtended)
    }

    /// The currently selected mailbox.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// UIDVALIDITY reported when the current mailbox was selected.
    #[must_use]
    pub const fn selected_uid_validity(&self) -> Option<UidValidity> {
        self.selected_uid_validity
    }

    /// Signs in with XOAUTH2, sending the token as a SASL initial response.
    ///
    /// When the server rejects the token with an error challenge, the
    /// challenge is acknowledged with an empty line and its JSON payload is
    /// returned as [`Error::OAuth`]. A plain tagged NO becomes
    /// [`Error::Auth`].
    pub async fn authenticate_xoauth2(&mut self, user: &str, access_token: &str) -> Result<()> {
        self.settle().await?;
        let tag = self.tags.next_tag();
        let command = Command::Authenticate {
            mechanism: "XOAUTH2".to_string(),
            initial_response: Some(xoauth2_response(user, access_token)),
        };
        debug!(%tag, command = command.name(), "sending");
        self.stream.write_command(&command.serialize(&tag)).await?;

        let mut challenge = None;
        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw)? {
                Response::Continuation { text } => {
                    challenge = text.as_deref().and_then(parse_challenge);
                    self.stream.write_command(b"\r\n").await?;
                }
                Response::Tagged {
                    tag: done,
                    status,
                    code,
                    text,
                } if done.as_str() == tag => {
                    return match status {
                        Status::Ok | Status::PreAuth => {
                            if let Some(ResponseCode::Capability(caps)) = code {
                                self.capabilities = caps;
                            }
                            Ok(())
                        }
                        Status::Bad if challenge.is_none() => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                        Status::No | Status::Bad => match challenge {
                            Some(err) => Err(Error::OAuth(err)),
                            None => Err(Error::Auth(text)),
                        },
                    };
                }
                Response::Untagged(UntaggedResponse::Capability(caps)) => self.capabilities = caps,
                Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                    return Err(Error::Bye(text));
                }
                _ => {}
            }
        }
    }

    /// Issues CAPABILITY and replaces the recorded capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let responses = self.execute(&Command::Capability).await?;
        for response in responses {
            if let UntaggedResponse::Capability(caps) = response {
                self.capabilities.clone_from(&caps);
                return Ok(caps);
            }
        }
        Ok(self.capabilities.clone())
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// `RETURN (CHILDREN)` is requested only when the server advertises
    /// LIST-EXTENDED.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let command = Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
            return_children: self.supports_list_extended(),
        };
        let responses = self.execute(&command).await?;
        Ok(responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::List(list) => Some(list),
                _ => None,
            })
            .collect())
    }

    /// Selects a mailbox. On failure no mailbox is selected.
    pub async fn select(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.selected = None;
        self.selected_uid_validity = None;
        let tag = self.send(&Command::Select {
            mailbox: mailbox.to_string(),
        })
        .await?;
        let (responses, code) = self.collect(&tag).await?;

        let mut status = MailboxStatus {
            read_only: matches!(code, Some(ResponseCode::ReadOnly)),
            ..MailboxStatus::default()
        };
        for response in responses {
            match response {
                UntaggedResponse::Exists(n) => status.exists = n,
                UntaggedResponse::Flags(flags) => status.flags = flags,
                UntaggedResponse::Ok {
                    code: Some(code), ..
                } => match code {
                    ResponseCode::UidValidity(v) => status.uid_validity = Some(v),
                    ResponseCode::UidNext(n) => status.uid_next = Some(n),
                    ResponseCode::PermanentFlags(flags) => {
                        status.permanent_flags = flags.into_iter().collect();
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        self.selected = Some(mailbox.to_string());
        self.selected_uid_validity = status.uid_validity;
        Ok(status)
    }

    /// Runs UID SEARCH and returns the matching UIDs.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        self.require_selected()?;
        let responses = self
            .execute(&Command::UidSearch {
                criteria: criteria.clone(),
            })
            .await?;
        Ok(responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Search(uids) => Some(uids),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Starts a UID FETCH and returns a stream over the messages as they
    /// arrive. The stream must be read to the end (or drained) before the
    /// next command; a dropped stream is drained on the next call.
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        attributes: &[FetchAttribute],
    ) -> Result<FetchStream<'_, S>> {
        self.require_selected()?;
        let tag = self
            .send(&Command::UidFetch {
                uids: uids.clone(),
                attributes: attributes.to_vec(),
            })
            .await?;
        self.pending = Some(tag.clone());
        Ok(FetchStream::new(self, tag))
    }

    /// Applies a flag change silently.
    pub async fn uid_store(&mut self, uids: &UidSet, action: &StoreAction) -> Result<()> {
        self.require_selected()?;
        self.execute(&Command::UidStore {
            uids: uids.clone(),
            action: action.clone(),
            silent: true,
        })
        .await?;
        Ok(())
    }

    /// Copies messages to `mailbox`.
    pub async fn uid_copy(&mut self, uids: &UidSet, mailbox: &str) -> Result<()> {
        self.require_selected()?;
        self.execute(&Command::UidCopy {
            uids: uids.clone(),
            mailbox: mailbox.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Moves messages to `mailbox` with the MOVE extension.
    pub async fn uid_move(&mut self, uids: &UidSet, mailbox: &str) -> Result<()> {
        self.require_selected()?;
        if !self.supports_move() {
            return Err(Error::InvalidState("server lacks MOVE".to_string()));
        }
        self.execute(&Command::UidMove {
            uids: uids.clone(),
            mailbox: mailbox.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Permanently removes every `\Deleted` message in the mailbox.
    pub async fn expunge(&mut self) -> Result<()> {
        self.require_selected()?;
        self.execute(&Command::Expunge).await?;
        Ok(())
    }

    /// Removes only the given `\Deleted` messages (UIDPLUS).
    pub async fn uid_expunge(&mut self, uids: &UidSet) -> Result<()> {
        self.require_selected()?;
        if !self.supports_uidplus() {
            return Err(Error::InvalidState("server lacks UIDPLUS".to_string()));
        }
        self.execute(&Command::UidExpunge { uids: uids.clone() })
            .await?;
        Ok(())
    }

    /// Says goodbye and closes the write half.
    pub async fn logout(&mut self) -> Result<()> {
        self.settle().await?;
        let tag = self.send(&Command::Logout).await?;
        loop {
            let raw = self.stream.read_response().await?;
            if is_tagged(&raw, &tag) {
                break;
            }
        }
        self.selected = None;
        self.selected_uid_validity = None;
        self.stream.shutdown().await
    }

    /// Sends a command and waits for its completion, returning the
    /// untagged data.
    async fn execute(&mut self, command: &Command) -> Result<Vec<UntaggedResponse>> {
        let tag = self.send(command).await?;
        let (responses, _) = self.collect(&tag).await?;
        Ok(responses)
    }

    async fn send(&mut self, command: &Command) -> Result<String> {
        self.settle().await?;
        let tag = self.tags.next_tag();
        debug!(%tag, command = command.name(), "sending");
        self.stream.write_command(&command.serialize(&tag)).await?;
        Ok(tag)
    }

    /// Reads to the tagged completion of `tag`. Returns the untagged data and
    /// the completion's response code; a NO or BAD completion is an error.
    async fn collect(
        &mut self,
        tag: &str,
    ) -> Result<(Vec<UntaggedResponse>, Option<ResponseCode>)> {
        let mut untagged = Vec::new();
        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: done,
                    status,
                    code,
                    text,
                }) if done.as_str() == tag => {
                    return match status {
                        Status::Ok | Status::PreAuth => Ok((untagged, code)),
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                    };
                }
                Ok(Response::Untagged(UntaggedResponse::Bye { text, .. })) => {
                    return Err(Error::Bye(text));
                }
                Ok(Response::Untagged(response)) => untagged.push(response),
                Ok(other) => debug!(?other, "ignoring response"),
                Err(err) if is_tagged(&raw, tag) => return Err(err),
                Err(err) => warn!(%err, "skipping unparsable response"),
            }
        }
    }

    /// Finishes a FETCH whose stream was dropped early.
    async fn settle(&mut self) -> Result<()> {
        if let Some(tag) = self.pending.take() {
            debug!(%tag, "draining abandoned FETCH");
            loop {
                let raw = self.stream.read_response().await?;
                if is_tagged(&raw, &tag) {
                    break;
                }
            }
        }
        Ok(())
    }

    fn require_selected(&self) -> Result<()> {
        if self.selected.is_some() {
            Ok(())
        } else {
            Err(Error::InvalidState("no mailbox selected".to_string()))
        }
    }
}
