//! Core IMAP identifiers.
//!
//! Types for UIDs and UIDVALIDITY.

use std::num::NonZeroU32;

/// Unique identifier for a message.
///
/// UIDs are persistent identifiers that don't change when messages are expunged.
/// Combined with `UIDVALIDITY`, they uniquely identify a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl Uid {
    /// Creates a new UID.
    ///
    /// Returns `None` if the value is 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UIDVALIDITY value for a mailbox.
///
/// If this value changes, all cached UIDs are invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UidValidity(pub NonZeroU32);

impl UidValidity {
    /// Creates a new UIDVALIDITY.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::unreadable_literal,
    clippy::similar_names
)]
mod tests {
    use super::*;

    mod uid_tests {
        use super::*;

        #[test]
        fn new_valid() {
            let uid = Uid::new(100);
            assert!(uid.is_some());
            assert_eq!(uid.unwrap().get(), 100);
        }

        #[test]
        fn new_zero_returns_none() {
            let uid = Uid::new(0);
            assert!(uid.is_none());
        }

        #[test]
        fn display() {
            let uid = Uid::new(12345).unwrap();
            assert_eq!(format!("{uid}"), "12345");
        }

        #[test]
        fn ordering() {
            let uid1 = Uid::new(100).unwrap();
            let uid2 = Uid::new(200).unwrap();
            assert!(uid1 < uid2);
        }
    }

    mod uid_validity_tests {
        use super::*;

        #[test]
        fn new_valid() {
            let uv = UidValidity::new(987654321);
            assert!(uv.is_some());
            assert_eq!(uv.unwrap().get(), 987654321);
        }

        #[test]
        fn new_zero_returns_none() {
            let uv = UidValidity::new(0);
            assert!(uv.is_none());
        }

        #[test]
        fn equality() {
            let uv1 = UidValidity::new(123).unwrap();
            let uv2 = UidValidity::new(123).unwrap();
            let uv3 = UidValidity::new(456).unwrap();
            assert_eq!(uv1, uv2);
            assert_ne!(uv1, uv3);
        }
    }
}
