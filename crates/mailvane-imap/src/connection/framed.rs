//! Framed I/O for IMAP protocol.
//!
//! IMAP responses are CRLF-terminated lines interleaved with byte-counted
//! literals. A line ending in `{n}` is immediately followed by exactly `n`
//! raw bytes which must never be scanned for delimiters. This module
//! provides buffered reading and writing with that framing.

#![allow(clippy::missing_errors_doc)]

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::parser::literal_length;
use crate::{Error, Result};

/// Read chunk size per socket call.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Framed connection for IMAP protocol.
///
/// Maintains a single accumulation buffer fed by chunked socket reads.
/// Callers alternate between [`read_line`](Self::read_line) and
/// [`read_literal`](Self::read_literal) as the response dictates.
pub struct FramedStream<S> {
    stream: S,
    buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Reads a single CRLF-terminated line, delimiter stripped.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; header payloads
    /// arrive as literals and are never passed through this path.
    pub async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(pos) = find_crlf(&self.buffer) {
                let line = self.buffer.split_to(pos + 2);
                return Ok(String::from_utf8_lossy(&line[..pos]).into_owned());
            }

            if self.buffer.len() > MAX_LINE_LENGTH {
                return Err(Error::Parse("line too long".to_string()));
            }

            self.fill_more().await?;
        }
    }

    /// Reads exactly `len` raw bytes.
    ///
    /// The bytes are returned verbatim, including any embedded CRLF.
    pub async fn read_literal(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > MAX_LITERAL_SIZE {
            return Err(Error::Parse(format!(
                "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
            )));
        }

        while self.buffer.len() < len {
            self.fill_more().await?;
        }

        Ok(self.buffer.split_to(len).to_vec())
    }

    /// Writes a command to the stream.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Pulls up to one chunk from the socket into the buffer.
    async fn fill_more(&mut self) -> Result<()> {
        self.buffer.reserve(READ_CHUNK_SIZE);
        let n = self.stream.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// One part of a command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// A text line, CRLF stripped.
    Line(String),
    /// A byte-counted literal, exactly as received.
    Literal(Vec<u8>),
}

/// A response reader that accumulates parts until the tagged completion.
pub struct ResponseAccumulator {
    tag: String,
    parts: Vec<ResponsePart>,
}

impl ResponseAccumulator {
    /// Creates a new response accumulator for the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            parts: Vec::new(),
        }
    }

    /// Reads parts until a line prefixed with `"<tag> "` arrives.
    ///
    /// Lines advertising a literal have the literal consumed via
    /// exact-length read before line parsing resumes, so literal content
    /// can never be mistaken for the tagged completion.
    pub async fn read_until_tagged<S>(
        &mut self,
        framed: &mut FramedStream<S>,
    ) -> Result<Vec<ResponsePart>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let line = framed.read_line().await?;

            let literal_len = literal_length(&line);
            let is_tagged = line
                .strip_prefix(self.tag.as_str())
                .is_some_and(|rest| rest.starts_with(' '));

            self.parts.push(ResponsePart::Line(line));

            if let Some(len) = literal_len {
                let literal = framed.read_literal(len).await?;
                self.parts.push(ResponsePart::Literal(literal));
            }

            if is_tagged {
                break;
            }
        }

        Ok(std::mem::take(&mut self.parts))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::unreadable_literal,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let line = framed.read_line().await.unwrap();
        assert_eq!(line, "* OK ready");
    }

    #[tokio::test]
    async fn test_read_line_across_chunks() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"* OK re").read(b"ady\r\n").build();
        let mut framed = FramedStream::new(mock);

        let line = framed.read_line().await.unwrap();
        assert_eq!(line, "* OK ready");
    }

    #[tokio::test]
    async fn test_read_literal_with_embedded_crlf() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[TEXT] {12}\r\n")
            .read(b"ab\r\ncd\r\nef\r\n")
            .read(b")\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let line = framed.read_line().await.unwrap();
        assert_eq!(line, "* 1 FETCH (BODY[TEXT] {12}");

        let literal = framed.read_literal(12).await.unwrap();
        assert_eq!(literal, b"ab\r\ncd\r\nef\r\n");

        let close = framed.read_line().await.unwrap();
        assert_eq!(close, ")");
    }

    #[tokio::test]
    async fn test_write_command() {
        use tokio_test::io::Builder;

        let mock = Builder::new().write(b"A0001 LOGIN \"u\" \"p\"\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed
            .write_command(b"A0001 LOGIN \"u\" \"p\"\r\n")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connection_closed() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"").build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_line().await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_accumulator_reads_until_tagged() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"* STATUS \"INBOX\" (UIDNEXT 4 UIDVALIDITY 99)\r\n")
            .read(b"A0001 OK STATUS completed\r\n")
            .build();

        let mut framed = FramedStream::new(mock);
        let mut accumulator = ResponseAccumulator::new("A0001");

        let parts = accumulator.read_until_tagged(&mut framed).await.unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0],
            ResponsePart::Line("* STATUS \"INBOX\" (UIDNEXT 4 UIDVALIDITY 99)".to_string())
        );
        assert_eq!(
            parts[1],
            ResponsePart::Line("A0001 OK STATUS completed".to_string())
        );
    }

    #[tokio::test]
    async fn test_accumulator_consumes_literal() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 9 BODY[TEXT] {5}\r\n")
            .read(b"hello")
            .read(b")\r\n")
            .read(b"A0002 OK FETCH completed\r\n")
            .build();

        let mut framed = FramedStream::new(mock);
        let mut accumulator = ResponseAccumulator::new("A0002");

        let parts = accumulator.read_until_tagged(&mut framed).await.unwrap();

        assert_eq!(parts.len(), 4);
        assert_eq!(
            parts[0],
            ResponsePart::Line("* 1 FETCH (UID 9 BODY[TEXT] {5}".to_string())
        );
        assert_eq!(parts[1], ResponsePart::Literal(b"hello".to_vec()));
        assert_eq!(parts[2], ResponsePart::Line(")".to_string()));
        assert_eq!(
            parts[3],
            ResponsePart::Line("A0002 OK FETCH completed".to_string())
        );
    }

    #[tokio::test]
    async fn test_tagged_line_must_be_followed_by_space() {
        use tokio_test::io::Builder;

        // A00010 is a different tag and must not complete A0001.
        let mock = Builder::new()
            .read(b"A00010 OK unrelated\r\n")
            .read(b"A0001 OK done\r\n")
            .build();

        let mut framed = FramedStream::new(mock);
        let mut accumulator = ResponseAccumulator::new("A0001");

        let parts = accumulator.read_until_tagged(&mut framed).await.unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        use tokio_test::io::Builder;

        let mock = Builder::new().build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_literal(MAX_LITERAL_SIZE + 1).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("literal too large")
        );
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        use tokio_test::io::Builder;

        // Feed more than MAX_LINE_LENGTH bytes without a CRLF.
        let chunk = vec![b'A'; MAX_LINE_LENGTH + 100];
        let mock = Builder::new().read(&chunk).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_line().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("line too long"));
    }
}
