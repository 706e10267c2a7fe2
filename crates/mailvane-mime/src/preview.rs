//! Plain-text preview extraction from message body excerpts.
//!
//! Builds a short one-line preview from the first kilobytes of a message
//! body: HTML is flattened, quoted replies and signature markers are
//! dropped, and the result is capped at a display-friendly length.

use crate::encoding::decode_text;

/// Maximum preview length in characters.
pub const PREVIEW_MAX_CHARS: usize = 280;

/// Extracts a preview from a raw body excerpt.
///
/// Returns `None` when there is no excerpt or nothing displayable
/// survives filtering, so callers can distinguish "no preview" from an
/// empty string.
#[must_use]
pub fn preview_text(data: Option<&[u8]>) -> Option<String> {
    let data = data?;
    let mut text = decode_text(data);
    text = text.replace('\0', "");

    if text.contains("<html")
        || text.contains("<body")
        || text.contains("<div")
        || text.contains("<p")
    {
        text = strip_tags(&text);
        text = text.replace("&nbsp;", " ");
        text = text.replace("&amp;", "&");
        text = text.replace("&lt;", "<");
        text = text.replace("&gt;", ">");
    }

    let mut output = String::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.starts_with('>') || line.starts_with("--") {
            continue;
        }
        let lower = line.to_lowercase();
        if lower.starts_with("on ") && lower.contains(" wrote:") {
            continue;
        }

        if !output.is_empty() {
            output.push(' ');
        }
        output.push_str(line);
        if output.chars().count() >= PREVIEW_MAX_CHARS {
            break;
        }
    }

    let capped: String = output.chars().take(PREVIEW_MAX_CHARS).collect();
    let trimmed = capped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Replaces `<...>` tag runs with a single space.
///
/// A tag needs at least one character between the brackets; a bare `<>`
/// or an unclosed `<` passes through literally.
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let Some(open) = rest.find('<') else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..open]);

        let tail = &rest[open + 1..];
        match tail.find('>') {
            Some(0) => {
                out.push('<');
                rest = tail;
            }
            Some(close) => {
                out.push(' ');
                rest = &tail[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_is_none() {
        assert_eq!(preview_text(None), None);
    }

    #[test]
    fn test_empty_and_whitespace_are_none() {
        assert_eq!(preview_text(Some(b"")), None);
        assert_eq!(preview_text(Some(b"  \r\n \t \r\n")), None);
    }

    #[test]
    fn test_plain_text_lines_join_with_spaces() {
        let body = b"Hi Bob,\r\n\r\nJust checking in\r\nabout the plan.\r\n";
        assert_eq!(
            preview_text(Some(body)).unwrap(),
            "Hi Bob, Just checking in about the plan."
        );
    }

    #[test]
    fn test_quoted_reply_lines_dropped() {
        let body = b"Sounds good.\r\n> earlier message\r\n> more quoting\r\n";
        assert_eq!(preview_text(Some(body)).unwrap(), "Sounds good.");
    }

    #[test]
    fn test_signature_and_attribution_dropped() {
        let body = b"See you then.\r\n-- \r\nAlice\r\nOn Mon, Jan 1, Bob wrote:\r\n";
        assert_eq!(preview_text(Some(body)).unwrap(), "See you then. Alice");
    }

    #[test]
    fn test_attribution_match_is_case_insensitive() {
        let body = b"ON MONDAY ALICE WROTE:\r\nkeep this\r\n";
        assert_eq!(preview_text(Some(body)).unwrap(), "keep this");
    }

    #[test]
    fn test_html_is_flattened() {
        let body = b"<html><body><p>Hello&nbsp;there</p><div>bye</div></body></html>";
        assert_eq!(preview_text(Some(body)).unwrap(), "Hello there  bye");
    }

    #[test]
    fn test_html_entities_unescaped() {
        let body = b"<p>a &amp; b &lt;ok&gt;</p>";
        assert_eq!(preview_text(Some(body)).unwrap(), "a & b <ok>");
    }

    #[test]
    fn test_only_quotes_is_none() {
        let body = b"> one\r\n> two\r\n";
        assert_eq!(preview_text(Some(body)), None);
    }

    #[test]
    fn test_nul_bytes_stripped() {
        let body = b"he\0llo\r\n";
        assert_eq!(preview_text(Some(body)).unwrap(), "hello");
    }

    #[test]
    fn test_latin1_fallback() {
        let body = [0x63, 0x61, 0x66, 0xE9];
        assert_eq!(preview_text(Some(&body)).unwrap(), "café");
    }

    #[test]
    fn test_capped_at_preview_max() {
        let long_line = "a".repeat(PREVIEW_MAX_CHARS * 2);
        let preview = preview_text(Some(long_line.as_bytes())).unwrap();
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS);
    }

    #[test]
    fn test_cap_counts_characters_not_bytes() {
        let long_line = "ä".repeat(PREVIEW_MAX_CHARS + 40);
        let preview = preview_text(Some(long_line.as_bytes())).unwrap();
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS);
    }

    #[test]
    fn test_accumulation_stops_after_cap() {
        let first = "b".repeat(PREVIEW_MAX_CHARS + 10);
        let body = format!("{first}\r\nnever included\r\n");
        let preview = preview_text(Some(body.as_bytes())).unwrap();
        assert!(!preview.contains("never"));
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS);
    }

    #[test]
    fn test_stray_angle_brackets_survive_html_path() {
        let body = b"<p>5 <> 4</p>";
        assert_eq!(preview_text(Some(body)).unwrap(), "5 <> 4");
    }
}
