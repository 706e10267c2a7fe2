//! IMAP command builder.
//!
//! This module provides types and serialization for IMAP commands.

mod serialize;
mod tag_generator;

pub use tag_generator::TagGenerator;

use crate::types::Uid;

use serialize::{write_quoted, write_uid_set};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// STATUS command requesting UIDNEXT and UIDVALIDITY.
    Status {
        /// Mailbox name.
        mailbox: String,
    },
    /// LIST command enumerating all mailboxes.
    List,
    /// UID SEARCH ALL command.
    UidSearchAll,
    /// UID SEARCH command over a UID range.
    UidSearchRange {
        /// First UID of the range.
        start: Uid,
        /// Last UID of the range, open-ended when `None`.
        end: Option<Uid>,
    },
    /// UID FETCH command for header fields, optionally with a body excerpt.
    UidFetchHeaders {
        /// UIDs to fetch.
        uids: Vec<Uid>,
        /// Also request the first 2048 bytes of the body text.
        preview: bool,
    },
    /// UID FETCH command for the full body text of one message.
    UidFetchBody {
        /// UID to fetch.
        uid: Uid,
    },
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_quoted(&mut buf, username);
                buf.push(b' ');
                write_quoted(&mut buf, password);
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_quoted(&mut buf, mailbox);
            }

            Self::Status { mailbox } => {
                buf.extend_from_slice(b"STATUS ");
                write_quoted(&mut buf, mailbox);
                buf.extend_from_slice(b" (UIDNEXT UIDVALIDITY)");
            }

            Self::List => buf.extend_from_slice(b"LIST \"\" \"*\""),

            Self::UidSearchAll => buf.extend_from_slice(b"UID SEARCH ALL"),

            Self::UidSearchRange { start, end } => {
                buf.extend_from_slice(b"UID SEARCH ");
                match end {
                    Some(end) => buf.extend_from_slice(format!("{start}:{end}").as_bytes()),
                    None => buf.extend_from_slice(format!("{start}:*").as_bytes()),
                }
            }

            Self::UidFetchHeaders { uids, preview } => {
                buf.extend_from_slice(b"UID FETCH ");
                write_uid_set(&mut buf, uids);
                buf.extend_from_slice(b" (UID BODY.PEEK[HEADER.FIELDS (DATE FROM SUBJECT)]");
                if *preview {
                    buf.extend_from_slice(b" BODY.PEEK[TEXT]<0.2048>");
                }
                buf.push(b')');
            }

            Self::UidFetchBody { uid } => {
                buf.extend_from_slice(format!("UID FETCH {uid} (UID BODY.PEEK[TEXT])").as_bytes());
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command keyword for logging.
    ///
    /// Arguments are never included, so credentials stay out of logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Status { .. } => "STATUS",
            Self::List => "LIST",
            Self::UidSearchAll | Self::UidSearchRange { .. } => "UID SEARCH",
            Self::UidFetchHeaders { .. } | Self::UidFetchBody { .. } => "UID FETCH",
        }
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

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    #[test]
    fn test_login_command() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(
            cmd.serialize("A0001"),
            b"A0001 LOGIN \"user@example.com\" \"secret\"\r\n"
        );
    }

    #[test]
    fn test_login_escapes_quotes_and_backslashes() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pa\"ss\\word".to_string(),
        };
        assert_eq!(
            cmd.serialize("A0001"),
            b"A0001 LOGIN \"user\" \"pa\\\"ss\\\\word\"\r\n"
        );
    }

    #[test]
    fn test_select_command() {
        let cmd = Command::Select {
            mailbox: "INBOX".to_string(),
        };
        assert_eq!(cmd.serialize("A0001"), b"A0001 SELECT \"INBOX\"\r\n");
    }

    #[test]
    fn test_select_mailbox_with_space() {
        let cmd = Command::Select {
            mailbox: "Sent Items".to_string(),
        };
        assert_eq!(cmd.serialize("A0002"), b"A0002 SELECT \"Sent Items\"\r\n");
    }

    #[test]
    fn test_status_command() {
        let cmd = Command::Status {
            mailbox: "INBOX".to_string(),
        };
        assert_eq!(
            cmd.serialize("A0003"),
            b"A0003 STATUS \"INBOX\" (UIDNEXT UIDVALIDITY)\r\n"
        );
    }

    #[test]
    fn test_list_command() {
        let cmd = Command::List;
        assert_eq!(cmd.serialize("A0001"), b"A0001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn test_uid_search_all_command() {
        let cmd = Command::UidSearchAll;
        assert_eq!(cmd.serialize("A0004"), b"A0004 UID SEARCH ALL\r\n");
    }

    #[test]
    fn test_uid_search_range_closed() {
        let cmd = Command::UidSearchRange {
            start: uid(10),
            end: Some(uid(12)),
        };
        assert_eq!(cmd.serialize("A0005"), b"A0005 UID SEARCH 10:12\r\n");
    }

    #[test]
    fn test_uid_search_range_open() {
        let cmd = Command::UidSearchRange {
            start: uid(10),
            end: None,
        };
        assert_eq!(cmd.serialize("A0005"), b"A0005 UID SEARCH 10:*\r\n");
    }

    #[test]
    fn test_uid_fetch_headers_command() {
        let cmd = Command::UidFetchHeaders {
            uids: vec![uid(1), uid(2), uid(3)],
            preview: false,
        };
        assert_eq!(
            cmd.serialize("A0006"),
            b"A0006 UID FETCH 1,2,3 (UID BODY.PEEK[HEADER.FIELDS (DATE FROM SUBJECT)])\r\n"
        );
    }

    #[test]
    fn test_uid_fetch_headers_with_preview_command() {
        let cmd = Command::UidFetchHeaders {
            uids: vec![uid(101), uid(102)],
            preview: true,
        };
        assert_eq!(
            cmd.serialize("A0007"),
            b"A0007 UID FETCH 101,102 (UID BODY.PEEK[HEADER.FIELDS (DATE FROM SUBJECT)] BODY.PEEK[TEXT]<0.2048>)\r\n"
                .to_vec()
        );
    }

    #[test]
    fn test_uid_fetch_body_command() {
        let cmd = Command::UidFetchBody { uid: uid(7) };
        assert_eq!(
            cmd.serialize("A0008"),
            b"A0008 UID FETCH 7 (UID BODY.PEEK[TEXT])\r\n"
        );
    }

    #[test]
    fn test_name_never_exposes_arguments() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        };
        assert_eq!(cmd.name(), "LOGIN");
        assert_eq!(Command::UidSearchAll.name(), "UID SEARCH");
        assert_eq!(Command::List.name(), "LIST");
    }
}
