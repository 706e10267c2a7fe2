//! Response line token extraction.
//!
//! Stateless helpers that pull literal counts, UIDs, status counters,
//! search results, and mailbox names out of response lines. Lines are
//! matched by token scanning rather than a full grammar; the subset of
//! responses this client consumes does not justify one.

use crate::types::Uid;

/// Returns the byte count when a line ends in a literal marker `{n}`.
pub(crate) fn literal_length(line: &str) -> Option<usize> {
    let rest = line.strip_suffix('}')?;
    let open = rest.rfind('{')?;
    rest[open + 1..].parse().ok()
}

/// Extracts the value following the first `UID ` token.
///
/// A value of 0 is not a valid UID and yields `None`.
pub(crate) fn uid_value(line: &str) -> Option<Uid> {
    let at = line.find("UID ")?;
    leading_digits(&line[at + 4..]).parse().ok().and_then(Uid::new)
}

/// Extracts the numeric value following `<key> ` in a STATUS line.
pub(crate) fn status_value(line: &str, key: &str) -> Option<u32> {
    let needle = format!("{key} ");
    let at = line.find(&needle)?;
    leading_digits(&line[at + needle.len()..]).parse().ok()
}

/// Parses the UIDs out of an untagged `* SEARCH` line.
///
/// Returns `None` for lines that are not search results. A bare
/// `* SEARCH` with no hits yields an empty vector.
pub(crate) fn search_uids(line: &str) -> Option<Vec<Uid>> {
    if !line.starts_with("* SEARCH") {
        return None;
    }
    Some(
        line.split_whitespace()
            .skip(2)
            .filter_map(|token| token.parse().ok().and_then(Uid::new))
            .collect(),
    )
}

/// Extracts the mailbox name from an untagged `* LIST` line.
///
/// Takes the last quoted substring on the line, falling back to the
/// last whitespace-delimited token with surrounding quotes trimmed.
pub(crate) fn list_mailbox_name(line: &str) -> Option<String> {
    if let Some(last) = line.rfind('"') {
        if let Some(first) = line[..last].rfind('"') {
            return Some(line[first + 1..last].to_string());
        }
    }
    line.split_whitespace()
        .last()
        .map(|token| token.trim_matches('"').to_string())
}

/// Returns true when a completion line for `tag` reports `OK`.
pub(crate) fn tagged_ok(line: &str, tag: &str) -> bool {
    line.strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix(' '))
        .is_some_and(|rest| rest.split_whitespace().next() == Some("OK"))
}

fn leading_digits(s: &str) -> &str {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    &s[..end]
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

    mod literal_length_tests {
        use super::*;

        #[test]
        fn parses_trailing_count() {
            assert_eq!(literal_length("BODY {123}"), Some(123));
            assert_eq!(literal_length("{0}"), Some(0));
            assert_eq!(
                literal_length("* 1 FETCH (UID 5 BODY[TEXT] {2048}"),
                Some(2048)
            );
        }

        #[test]
        fn rejects_non_literal_lines() {
            assert_eq!(literal_length("no literal"), None);
            assert_eq!(literal_length("incomplete {123"), None);
            assert_eq!(literal_length("wrong {abc}"), None);
            assert_eq!(literal_length("{12+}"), None);
            assert_eq!(literal_length(""), None);
        }

        #[test]
        fn takes_last_brace_pair() {
            assert_eq!(literal_length("a {1} b {42}"), Some(42));
        }
    }

    mod uid_value_tests {
        use super::*;

        #[test]
        fn extracts_uid_token() {
            let line = "* 2 FETCH (UID 102 BODY[HEADER.FIELDS (DATE FROM SUBJECT)] {64}";
            assert_eq!(uid_value(line), Uid::new(102));
        }

        #[test]
        fn missing_token_is_none() {
            assert_eq!(uid_value("* 2 FETCH (FLAGS (\\Seen))"), None);
        }

        #[test]
        fn zero_is_none() {
            assert_eq!(uid_value("* 2 FETCH (UID 0 FLAGS ())"), None);
        }

        #[test]
        fn non_numeric_is_none() {
            assert_eq!(uid_value("* 2 FETCH (UID x)"), None);
        }
    }

    mod status_value_tests {
        use super::*;

        #[test]
        fn extracts_both_counters() {
            let line = "* STATUS \"INBOX\" (UIDNEXT 4392 UIDVALIDITY 3857529045)";
            assert_eq!(status_value(line, "UIDNEXT"), Some(4392));
            assert_eq!(status_value(line, "UIDVALIDITY"), Some(3857529045));
        }

        #[test]
        fn missing_key_is_none() {
            let line = "* STATUS \"INBOX\" (UIDNEXT 4392)";
            assert_eq!(status_value(line, "UIDVALIDITY"), None);
        }
    }

    mod search_uids_tests {
        use super::*;

        #[test]
        fn parses_uid_list() {
            let uids = search_uids("* SEARCH 4 7 9").unwrap();
            assert_eq!(uids, vec![
                Uid::new(4).unwrap(),
                Uid::new(7).unwrap(),
                Uid::new(9).unwrap()
            ]);
        }

        #[test]
        fn empty_result_is_empty_vec() {
            assert_eq!(search_uids("* SEARCH"), Some(Vec::new()));
        }

        #[test]
        fn other_lines_are_none() {
            assert_eq!(search_uids("* 3 EXISTS"), None);
            assert_eq!(search_uids("A0001 OK SEARCH completed"), None);
        }

        #[test]
        fn skips_non_numeric_tokens() {
            let uids = search_uids("* SEARCH 4 x 9").unwrap();
            assert_eq!(uids, vec![Uid::new(4).unwrap(), Uid::new(9).unwrap()]);
        }
    }

    mod list_mailbox_name_tests {
        use super::*;

        #[test]
        fn extracts_quoted_name() {
            let line = "* LIST (\\HasNoChildren) \"/\" \"Archive\"";
            assert_eq!(list_mailbox_name(line), Some("Archive".to_string()));
        }

        #[test]
        fn quoted_name_with_space() {
            let line = "* LIST (\\HasNoChildren) \"/\" \"Sent Items\"";
            assert_eq!(list_mailbox_name(line), Some("Sent Items".to_string()));
        }

        #[test]
        fn falls_back_to_last_token() {
            let line = "* LIST (\\Noselect) NIL Notes";
            assert_eq!(list_mailbox_name(line), Some("Notes".to_string()));
        }

        #[test]
        fn empty_line_is_none() {
            assert_eq!(list_mailbox_name(""), None);
        }
    }

    mod tagged_ok_tests {
        use super::*;

        #[test]
        fn ok_completion() {
            assert!(tagged_ok("A0001 OK LOGIN completed", "A0001"));
        }

        #[test]
        fn no_completion() {
            assert!(!tagged_ok("A0001 NO [AUTHENTICATIONFAILED] bad", "A0001"));
        }

        #[test]
        fn bad_completion() {
            assert!(!tagged_ok("A0001 BAD parse error", "A0001"));
        }

        #[test]
        fn wrong_tag() {
            assert!(!tagged_ok("A0002 OK done", "A0001"));
        }

        #[test]
        fn tag_prefix_without_space() {
            assert!(!tagged_ok("A00010 OK done", "A0001"));
        }
    }
}
