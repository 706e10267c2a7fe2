//! MIME encoding and decoding utilities.
//!
//! Supports Base64, RFC 2047 encoded-word handling, and charset decoding
//! with Latin-1 fallback.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Result;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes raw bytes as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte to a character, so this never fails; mangled
/// input yields mangled but displayable text.
#[must_use]
pub fn decode_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => latin1_to_string(data),
    }
}

fn latin1_to_string(data: &[u8]) -> String {
    data.iter().map(|&b| char::from(b)).collect()
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?encoding?encoded-text?=`
///
/// # Arguments
///
/// * `text` - Text to encode
/// * `charset` - Character set (e.g., "utf-8")
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_rfc2047(text: &str, charset: &str) -> Result<String> {
    // Only encode if necessary (contains non-ASCII)
    if text.chars().all(|c| c.is_ascii() && c != '=' && c != '?') {
        return Ok(text.to_string());
    }

    // Use Base64 encoding (Q encoding is more complex)
    let encoded = encode_base64(text.as_bytes());
    Ok(format!("=?{charset}?B?{encoded}?="))
}

/// Decodes all RFC 2047 encoded words in a header value.
///
/// Each `=?charset?B?...?=` or `=?charset?Q?...?=` word found anywhere in
/// the value is replaced with its decoded text; surrounding text is kept
/// as-is. Replacement runs from the last word backwards so earlier byte
/// offsets stay valid. A word that fails to decode (bad Base64, or bytes
/// that are not valid UTF-8 for a utf-8 charset) is left untouched.
///
/// Charset handling matches common client behavior: `utf-8` (any case)
/// decodes as UTF-8, everything else as Latin-1.
#[must_use]
pub fn decode_rfc2047(value: &str) -> String {
    let words = find_encoded_words(value);
    if words.is_empty() {
        return value.to_string();
    }

    let mut output = value.to_string();
    for word in words.iter().rev() {
        if let Some(decoded) = decode_word(word) {
            output.replace_range(word.start..word.end, &decoded);
        }
    }
    output
}

/// One `=?charset?E?text?=` occurrence, with byte offsets into the
/// original value.
struct EncodedWord<'a> {
    /// Offset of the leading `=?`.
    start: usize,
    /// Offset one past the trailing `?=`.
    end: usize,
    charset: &'a str,
    encoding: char,
    text: &'a str,
}

fn find_encoded_words(value: &str) -> Vec<EncodedWord<'_>> {
    let mut words = Vec::new();
    let mut pos = 0;
    while let Some(found) = value[pos..].find("=?") {
        let start = pos + found;
        if let Some(word) = parse_encoded_word(value, start) {
            pos = word.end;
            words.push(word);
        } else {
            pos = start + 1;
        }
    }
    words
}

/// Parses one encoded word starting at `start` (which points at `=?`).
///
/// Charset and text must be non-empty and free of `?`; the encoding is a
/// single `B`/`Q` (either case).
fn parse_encoded_word(value: &str, start: usize) -> Option<EncodedWord<'_>> {
    let rest = &value[start + 2..];

    let charset_end = rest.find('?')?;
    if charset_end == 0 {
        return None;
    }
    let charset = &rest[..charset_end];

    let mut after = rest[charset_end + 1..].chars();
    let encoding = after.next()?;
    if !matches!(encoding, 'b' | 'B' | 'q' | 'Q') {
        return None;
    }
    if after.next() != Some('?') {
        return None;
    }

    let text_start = charset_end + 3;
    let text_len = rest[text_start..].find('?')?;
    if text_len == 0 {
        return None;
    }
    let text = &rest[text_start..text_start + text_len];

    let close = text_start + text_len + 1;
    if !rest[close..].starts_with('=') {
        return None;
    }

    Some(EncodedWord {
        start,
        end: start + 2 + close + 1,
        charset,
        encoding,
        text,
    })
}

fn decode_word(word: &EncodedWord<'_>) -> Option<String> {
    let bytes = if matches!(word.encoding, 'b' | 'B') {
        STANDARD.decode(word.text).ok()?
    } else {
        q_decode_bytes(word.text)
    };

    if word.charset.eq_ignore_ascii_case("utf-8") {
        String::from_utf8(bytes).ok()
    } else {
        Some(latin1_to_string(&bytes))
    }
}

/// RFC 2047 "Q" encoding: quoted-printable with `_` standing for space.
///
/// A `=` that is not followed by two hex digits passes through literally
/// rather than failing the whole word.
fn q_decode_bytes(text: &str) -> Vec<u8> {
    let input = text.as_bytes();
    let mut bytes = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        if c == b'_' {
            bytes.push(b' ');
            i += 1;
            continue;
        }
        if c == b'=' && i + 2 < input.len() {
            if let (Some(hi), Some(lo)) = (hex_value(input[i + 1]), hex_value(input[i + 2])) {
                bytes.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        bytes.push(c);
        i += 1;
    }

    bytes
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("Héllo".as_bytes()), "Héllo");
    }

    #[test]
    fn test_decode_text_latin1_fallback() {
        // 0xE9 is not valid UTF-8 on its own; Latin-1 reads it as é.
        assert_eq!(decode_text(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_rfc2047_encode() {
        let encoded = encode_rfc2047("Hello", "utf-8").unwrap();
        assert_eq!(encoded, "Hello"); // No encoding needed

        let encoded = encode_rfc2047("Héllo", "utf-8").unwrap();
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_decode_plain_value_unchanged() {
        assert_eq!(decode_rfc2047("Hello, World!"), "Hello, World!");
        assert_eq!(decode_rfc2047(""), "");
    }

    #[test]
    fn test_decode_base64_word() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
        assert_eq!(decode_rfc2047("=?UTF-8?b?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_decode_q_word() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?="), "Héllo");
        assert_eq!(decode_rfc2047("=?utf-8?q?a_b?="), "a b");
    }

    #[test]
    fn test_decode_word_embedded_in_text() {
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?B?SMOpbGxv?= again"),
            "Re: Héllo again"
        );
    }

    #[test]
    fn test_decode_multiple_words() {
        let value = "=?utf-8?B?SMOpbGxv?= =?utf-8?Q?w=C3=B6rld?=";
        assert_eq!(decode_rfc2047(value), "Héllo wörld");
    }

    #[test]
    fn test_decode_latin1_charset() {
        assert_eq!(decode_rfc2047("=?iso-8859-1?Q?caf=E9?="), "café");
        assert_eq!(decode_rfc2047("=?iso-8859-1?B?Y2Fm6Q==?="), "café");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_latin1() {
        // "utf8" without the hyphen is not recognized as UTF-8, so the
        // two bytes of é decode as two Latin-1 characters.
        assert_eq!(decode_rfc2047("=?utf8?B?SMOpbGxv?="), "HÃ©llo");
    }

    #[test]
    fn test_invalid_base64_word_left_untouched() {
        let value = "=?utf-8?B?#$%?=";
        assert_eq!(decode_rfc2047(value), value);
    }

    #[test]
    fn test_invalid_utf8_word_left_untouched() {
        // 0xFF is never valid UTF-8.
        let value = "=?utf-8?B?/w==?=";
        assert_eq!(decode_rfc2047(value), value);
    }

    #[test]
    fn test_q_bad_hex_passes_through() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?=ZZ?="), "=ZZ");
        assert_eq!(decode_rfc2047("=?utf-8?Q?a=4?="), "a=4");
    }

    #[test]
    fn test_malformed_words_left_untouched() {
        // Empty charset, empty text, missing close.
        assert_eq!(decode_rfc2047("=??B?eA==?="), "=??B?eA==?=");
        assert_eq!(decode_rfc2047("=?utf-8?B??="), "=?utf-8?B??=");
        assert_eq!(decode_rfc2047("=?utf-8?B?eA==?"), "=?utf-8?B?eA==?");
        assert_eq!(decode_rfc2047("=?utf-8?X?eA==?="), "=?utf-8?X?eA==?=");
    }

    proptest! {
        #[test]
        fn prop_base64_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode_base64(&data);
            prop_assert_eq!(decode_base64(&encoded).unwrap(), data);
        }

        #[test]
        fn prop_rfc2047_roundtrip(text in ".*") {
            let encoded = encode_rfc2047(&text, "utf-8").unwrap();
            prop_assert_eq!(decode_rfc2047(&encoded), text);
        }
    }
}
