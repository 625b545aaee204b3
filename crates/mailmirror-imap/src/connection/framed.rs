//! CRLF and literal framing.
//!
//! A server response is one CRLF-terminated line, unless the line ends in a
//! literal announcement `{n}`, in which case n raw bytes and another line
//! follow. [`FramedStream::read_response`] returns the whole thing as one
//! buffer for the parser.
//!
//! A literal above the size cap is read off the wire and discarded; the
//! response carries `NIL` in its place so the rest of it still parses.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Longest line accepted between literals.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Default largest literal kept; bounds the memory a single message can
/// take.
pub const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Literals are read in chunks so the idle timeout applies to each chunk
/// rather than to the whole transfer.
const LITERAL_CHUNK: usize = 64 * 1024;

/// Buffered, framed connection with an optional per-operation timeout.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    io_timeout: Option<Duration>,
    max_literal: usize,
    dropped_literals: usize,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `stream` without a timeout.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            io_timeout: None,
            max_literal: MAX_LITERAL_SIZE,
            dropped_literals: 0,
        }
    }

    /// Wraps `stream`; every read and write fails with [`Error::Timeout`]
    /// if it makes no progress within `timeout`.
    pub fn with_timeout(stream: S, timeout: Duration) -> Self {
        let mut framed = Self::new(stream);
        framed.io_timeout = Some(timeout);
        framed
    }

    /// Sets the largest literal kept in a response.
    #[must_use]
    pub const fn with_max_literal_size(mut self, max: usize) -> Self {
        self.max_literal = max;
        self
    }

    /// Number of literals of the last response that exceeded the size cap
    /// and were replaced by `NIL`.
    #[must_use]
    pub const fn dropped_literals(&self) -> usize {
        self.dropped_literals
    }

    /// Reads one complete response including embedded literals.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        self.dropped_literals = 0;
        let mut response = Vec::new();
        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some((open, len)) = literal_announcement(&line) else {
                return Ok(response);
            };
            if len > self.max_literal {
                warn!(len, max = self.max_literal, "discarding oversized literal");
                self.discard(len).await?;
                response.truncate(response.len() - (line.len() - open));
                response.extend_from_slice(b"NIL");
                self.dropped_literals += 1;
                continue;
            }

            let start = response.len();
            response.resize(start + len, 0);
            let limit = self.io_timeout;
            for chunk in response[start..].chunks_mut(LITERAL_CHUNK) {
                bounded(limit, self.reader.read_exact(chunk)).await?;
            }
        }
    }

    async fn discard(&mut self, mut remaining: usize) -> Result<()> {
        let limit = self.io_timeout;
        let mut scratch = vec![0; remaining.min(LITERAL_CHUNK)];
        while remaining > 0 {
            let n = remaining.min(LITERAL_CHUNK);
            bounded(limit, self.reader.read_exact(&mut scratch[..n])).await?;
            remaining -= n;
        }
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let limit = self.io_timeout;
        let mut line = Vec::new();
        loop {
            let buf = bounded(limit, self.reader.fill_buf()).await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            // A CR at the end of the previous chunk may pair with an LF here.
            if line.last() == Some(&b'\r') && buf[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                return Ok(line);
            }

            if let Some(pos) = buf.windows(2).position(|w| w == b"\r\n") {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);
            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes and flushes one serialized command.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let limit = self.io_timeout;
        let stream = self.reader.get_mut();
        bounded(limit, stream.write_all(&self.write_buffer)).await?;
        bounded(limit, stream.flush()).await?;
        Ok(())
    }

    /// Shuts down the write half.
    pub async fn shutdown(&mut self) -> Result<()> {
        let limit = self.io_timeout;
        bounded(limit, self.reader.get_mut().shutdown()).await?;
        Ok(())
    }

    /// Consumes the framing and returns the stream. Buffered input is lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

async fn bounded<T>(limit: Option<Duration>, fut: impl Future<Output = io::Result<T>>) -> Result<T> {
    match limit {
        Some(limit) => Ok(tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit))??),
        None => Ok(fut.await?),
    }
}

/// Returns the offset of `{` and n when the line ends in `{n}\r\n` or
/// `{n+}\r\n`.
fn literal_announcement(line: &[u8]) -> Option<(usize, usize)> {
    let body = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let len = std::str::from_utf8(digits).ok()?.parse().ok()?;
    Some((open, len))
}

/// Returns true when `response` is the tagged completion for `tag`.
#[must_use]
pub fn is_tagged(response: &[u8], tag: &str) -> bool {
    response
        .strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}
