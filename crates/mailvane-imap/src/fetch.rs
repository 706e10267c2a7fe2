//! Fetch response assembly.
//!
//! A batched `UID FETCH` response interleaves `FETCH` lines with one or
//! two literals per message (header fields, then optionally a body
//! excerpt). This module pairs each literal with the message it belongs
//! to and classifies it by the markers on the announcing line.

use crate::connection::ResponsePart;
use crate::parser;
use crate::types::Uid;
use crate::{Error, Result};

/// Raw fetch result for one message.
///
/// Header and preview bytes are returned undecoded; interpreting them
/// is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// The message UID.
    pub uid: Uid,
    /// Raw header-fields literal.
    pub headers: Vec<u8>,
    /// Raw body excerpt literal, when one was requested and returned.
    pub preview: Option<Vec<u8>>,
}

#[derive(Debug)]
enum LiteralKind {
    Headers,
    Preview,
}

#[derive(Debug)]
struct PartialFetch {
    uid: Uid,
    headers: Option<Vec<u8>>,
    preview: Option<Vec<u8>>,
}

/// Assembles per-message results from a batched fetch response.
///
/// Each literal is attributed to the message whose UID token most
/// recently appeared, keyed by UID so servers that split or repeat
/// `FETCH` lines still pair correctly. A literal announced by a line
/// with neither a header-fields nor a body-text marker is discarded.
/// Messages that never receive a headers literal are dropped from the
/// result rather than failing the batch.
pub(crate) fn collect_messages(parts: &[ResponsePart]) -> Vec<FetchedMessage> {
    let mut partials: Vec<PartialFetch> = Vec::new();
    let mut cursor: Option<usize> = None;
    let mut pending: Option<LiteralKind> = None;

    for part in parts {
        match part {
            ResponsePart::Line(line) => {
                if let Some(uid) = parser::uid_value(line) {
                    cursor = Some(position_for(&mut partials, uid));
                }

                pending = if line.contains("HEADER.FIELDS") {
                    Some(LiteralKind::Headers)
                } else if line.contains("BODY[TEXT]") || line.contains("BODY.PEEK[TEXT]") {
                    Some(LiteralKind::Preview)
                } else {
                    None
                };
            }
            ResponsePart::Literal(data) => {
                if let (Some(idx), Some(kind)) = (cursor, pending.take()) {
                    match kind {
                        LiteralKind::Headers => partials[idx].headers = Some(data.clone()),
                        LiteralKind::Preview => partials[idx].preview = Some(data.clone()),
                    }
                }
            }
        }
    }

    partials
        .into_iter()
        .filter_map(|partial| match partial.headers {
            Some(headers) => Some(FetchedMessage {
                uid: partial.uid,
                headers,
                preview: partial.preview,
            }),
            None => {
                tracing::debug!(uid = %partial.uid, "fetch entry missing headers literal, skipped");
                None
            }
        })
        .collect()
}

/// Extracts the mandatory body literal from a single-UID fetch response.
///
/// # Errors
///
/// Returns [`Error::UnexpectedResponse`] when no literal is paired with
/// the requested UID; a body fetch without its literal has no usable
/// result.
pub(crate) fn single_literal(parts: &[ResponsePart], uid: Uid) -> Result<Vec<u8>> {
    for (i, part) in parts.iter().enumerate() {
        if let ResponsePart::Line(line) = part {
            if line.contains("FETCH") && parser::uid_value(line) == Some(uid) {
                if let Some(ResponsePart::Literal(data)) = parts.get(i + 1) {
                    return Ok(data.clone());
                }
            }
        }
    }

    Err(Error::UnexpectedResponse(format!(
        "no body literal for UID {uid}"
    )))
}

fn position_for(partials: &mut Vec<PartialFetch>, uid: Uid) -> usize {
    if let Some(idx) = partials.iter().position(|p| p.uid == uid) {
        return idx;
    }
    partials.push(PartialFetch {
        uid,
        headers: None,
        preview: None,
    });
    partials.len() - 1
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

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    fn line(s: &str) -> ResponsePart {
        ResponsePart::Line(s.to_string())
    }

    fn literal(data: &[u8]) -> ResponsePart {
        ResponsePart::Literal(data.to_vec())
    }

    #[test]
    fn test_headers_only_batch() {
        let parts = vec![
            line("* 1 FETCH (UID 101 BODY[HEADER.FIELDS (DATE FROM SUBJECT)] {20}"),
            literal(b"Subject: first\r\n\r\n\r\n"),
            line(")"),
            line("* 2 FETCH (UID 102 BODY[HEADER.FIELDS (DATE FROM SUBJECT)] {21}"),
            literal(b"Subject: second\r\n\r\n\r\n"),
            line(")"),
            line("A0003 OK FETCH completed"),
        ];

        let messages = collect_messages(&parts);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].uid, uid(101));
        assert_eq!(messages[0].headers, b"Subject: first\r\n\r\n\r\n");
        assert!(messages[0].preview.is_none());
        assert_eq!(messages[1].uid, uid(102));
    }

    #[test]
    fn test_headers_and_preview_batch() {
        let parts = vec![
            line("* 1 FETCH (UID 7 BODY[HEADER.FIELDS (DATE FROM SUBJECT)] {16}"),
            literal(b"Subject: hi\r\n\r\n\r"),
            line(" BODY[TEXT]<0> {11}"),
            literal(b"hello world"),
            line(")"),
            line("A0004 OK FETCH completed"),
        ];

        let messages = collect_messages(&parts);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].uid, uid(7));
        assert_eq!(messages[0].preview.as_deref(), Some(b"hello world".as_ref()));
    }

    #[test]
    fn test_preview_line_without_uid_uses_current_message() {
        // Some servers repeat the UID on every line, some only on the first.
        let parts = vec![
            line("* 5 FETCH (UID 33 BODY[HEADER.FIELDS (DATE FROM SUBJECT)] {14}"),
            literal(b"From: a@b.c\r\n\r"),
            line(" BODY.PEEK[TEXT]<0.2048> {4}"),
            literal(b"body"),
            line(")"),
        ];

        let messages = collect_messages(&parts);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].uid, uid(33));
        assert_eq!(messages[0].preview.as_deref(), Some(b"body".as_ref()));
    }

    #[test]
    fn test_entry_without_headers_is_dropped() {
        let parts = vec![
            line("* 1 FETCH (UID 40 FLAGS (\\Seen))"),
            line("* 2 FETCH (UID 41 BODY[HEADER.FIELDS (DATE FROM SUBJECT)] {12}"),
            literal(b"Subject: x\r\n"),
            line(")"),
        ];

        let messages = collect_messages(&parts);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].uid, uid(41));
    }

    #[test]
    fn test_unclassified_literal_is_discarded() {
        let parts = vec![
            line("* 1 FETCH (UID 50 RFC822.SIZE {5}"),
            literal(b"xxxxx"),
            line(")"),
        ];

        let messages = collect_messages(&parts);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_repeated_uid_lines_merge_into_one_entry() {
        let parts = vec![
            line("* 1 FETCH (UID 60 BODY[HEADER.FIELDS (DATE FROM SUBJECT)] {12}"),
            literal(b"Subject: y\r\n"),
            line("* 1 FETCH (UID 60 BODY[TEXT]<0> {3}"),
            literal(b"abc"),
        ];

        let messages = collect_messages(&parts);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].uid, uid(60));
        assert_eq!(messages[0].preview.as_deref(), Some(b"abc".as_ref()));
    }

    #[test]
    fn test_single_literal_found() {
        let parts = vec![
            line("* 3 FETCH (UID 70 BODY[TEXT] {9}"),
            literal(b"full body"),
            line(")"),
            line("A0005 OK FETCH completed"),
        ];

        let body = single_literal(&parts, uid(70)).unwrap();
        assert_eq!(body, b"full body");
    }

    #[test]
    fn test_single_literal_wrong_uid_is_error() {
        let parts = vec![
            line("* 3 FETCH (UID 71 BODY[TEXT] {4}"),
            literal(b"body"),
        ];

        let result = single_literal(&parts, uid(70));
        assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
    }

    #[test]
    fn test_single_literal_missing_is_error() {
        let parts = vec![line("* 3 FETCH (UID 70 FLAGS (\\Seen))")];

        let result = single_literal(&parts, uid(70));
        assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
    }
}
