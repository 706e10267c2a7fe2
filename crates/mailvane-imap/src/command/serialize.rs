//! Command serialization helpers.

use crate::types::Uid;

/// Writes a quoted string, escaping backslash and double-quote.
///
/// Every value is quoted, so mailbox names with spaces and empty
/// strings serialize unambiguously.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Writes a comma-joined UID set.
pub fn write_uid_set(buf: &mut Vec<u8>, uids: &[Uid]) {
    for (i, uid) in uids.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        buf.extend_from_slice(uid.to_string().as_bytes());
    }
}
