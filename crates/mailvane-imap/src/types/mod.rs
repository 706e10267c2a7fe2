//! Core IMAP types.
//!
//! This module defines the identifier and status types used throughout
//! the library.

#![allow(clippy::missing_const_for_fn)]

mod identifiers;
mod mailbox;

pub use identifiers::{Uid, UidValidity};
pub use mailbox::MailboxStatus;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_new() {
        assert!(Uid::new(0).is_none());
        assert!(Uid::new(1).is_some());
        assert_eq!(Uid::new(123).unwrap().get(), 123);
    }

    #[test]
    fn test_uid_validity_new() {
        assert!(UidValidity::new(0).is_none());
        assert!(UidValidity::new(1).is_some());
    }

    #[test]
    fn test_mailbox_status_default() {
        let status = MailboxStatus::new();
        assert!(status.uid_validity.is_none());
        assert!(status.uid_next.is_none());
    }
}
