//! Email header parsing: folded field assembly and envelope extraction.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::date::parse_date;
use crate::encoding::{decode_rfc2047, decode_text};

/// Collection of parsed header fields.
///
/// Field names are lowercased; a repeated field keeps its last value.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: HashMap<String, String>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field value, replacing any existing one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into().to_lowercase(), value.into());
    }

    /// Gets a field value by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Returns the number of distinct fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses a raw header block.
    ///
    /// Continuation lines (leading space or tab) fold into the current
    /// field joined by a single space. A non-continuation line without a
    /// colon resets the current field, so stray continuations after it
    /// are dropped. Empty lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for line in text.lines() {
            if line.is_empty() {
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_some() {
                    current_value.push(' ');
                    current_value.push_str(line.trim());
                }
                continue;
            }

            if let Some(name) = current_name.take() {
                headers.set(name, current_value.trim());
            }
            current_value.clear();

            if let Some((name, value)) = line.split_once(':') {
                current_name = Some(name.trim().to_lowercase());
                current_value = value.trim().to_string();
            }
        }

        if let Some(name) = current_name {
            headers.set(name, current_value.trim());
        }

        headers
    }
}

/// Envelope fields extracted from a fetched header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeaders {
    /// Decoded `Subject` value; empty when the header is missing.
    pub subject: String,
    /// Decoded `From` value; empty when the header is missing.
    pub from: String,
    /// Parsed `Date` value, when present and well-formed.
    pub date: Option<DateTime<FixedOffset>>,
}

impl ParsedHeaders {
    /// Parses a raw header literal as returned by a fetch.
    ///
    /// Bytes decode as UTF-8 with Latin-1 fallback. Subject and From pass
    /// through RFC 2047 decoding; an unparsable or missing date is `None`.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let text = decode_text(raw);
        let headers = Headers::parse(&text);
        Self {
            subject: decode_rfc2047(headers.get("subject").unwrap_or_default()),
            from: decode_rfc2047(headers.get("from").unwrap_or_default()),
            date: headers.get("date").and_then(parse_date),
        }
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
    use super::*;

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_folded_value_joins_with_single_space() {
        let text = "Subject: a very\r\n   long\r\n\tsubject line\r\n";
        let headers = Headers::parse(text);
        assert_eq!(headers.get("subject"), Some("a very long subject line"));
    }

    #[test]
    fn test_line_without_colon_resets_current_field() {
        let text = concat!(
            "Subject: first\r\n",
            "garbage line with no separator\r\n",
            " orphaned continuation\r\n",
            "From: a@b.example\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("subject"), Some("first"));
        assert_eq!(headers.get("from"), Some("a@b.example"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_repeated_field_keeps_last_value() {
        let text = "Received: first hop\r\nReceived: second hop\r\n";
        let headers = Headers::parse(text);
        assert_eq!(headers.get("received"), Some("second hop"));
    }

    #[test]
    fn test_value_keeps_embedded_colons() {
        let headers = Headers::parse("Subject: Re: the 3:1 plan\r\n");
        assert_eq!(headers.get("subject"), Some("Re: the 3:1 plan"));
    }

    #[test]
    fn test_parsed_headers_envelope() {
        let raw = concat!(
            "Date: Mon, 1 Jan 2024 09:00:00 +0000\r\n",
            "From: Alice <alice@example.com>\r\n",
            "Subject: Hello\r\n",
            "\r\n"
        )
        .as_bytes();

        let parsed = ParsedHeaders::parse(raw);
        assert_eq!(parsed.subject, "Hello");
        assert_eq!(parsed.from, "Alice <alice@example.com>");
        assert_eq!(
            parsed.date.unwrap().to_rfc3339(),
            "2024-01-01T09:00:00+00:00"
        );
    }

    #[test]
    fn test_parsed_headers_decodes_encoded_words() {
        let raw = concat!(
            "Subject: =?utf-8?B?SMOpbGxv?=\r\n",
            "From: =?utf-8?Q?Ren=C3=A9?= <rene@example.com>\r\n",
            "\r\n"
        )
        .as_bytes();

        let parsed = ParsedHeaders::parse(raw);
        assert_eq!(parsed.subject, "Héllo");
        assert_eq!(parsed.from, "René <rene@example.com>");
        assert_eq!(parsed.date, None);
    }

    #[test]
    fn test_parsed_headers_missing_fields_are_empty() {
        let parsed = ParsedHeaders::parse(b"X-Other: something\r\n\r\n");
        assert_eq!(parsed.subject, "");
        assert_eq!(parsed.from, "");
        assert_eq!(parsed.date, None);
    }

    #[test]
    fn test_parsed_headers_latin1_fallback() {
        let mut raw = b"Subject: caf".to_vec();
        raw.push(0xE9);
        raw.extend_from_slice(b"\r\n\r\n");

        let parsed = ParsedHeaders::parse(&raw);
        assert_eq!(parsed.subject, "café");
    }

    #[test]
    fn test_parsed_headers_bad_date_is_none() {
        let parsed = ParsedHeaders::parse(b"Date: yesterday-ish\r\n\r\n");
        assert_eq!(parsed.date, None);
    }
}
