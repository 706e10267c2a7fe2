//! Type-state markers for IMAP client connection states.
//!
//! These types are used with the type-state pattern to enforce valid IMAP
//! state transitions at compile time. Unlike the marker types, `Selected`
//! carries runtime state about the currently selected mailbox.

use std::sync::Arc;

/// Marker type for the not-authenticated state.
///
/// In this state, only the LOGIN command is valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state, mailbox operations (SELECT, LIST, STATUS) are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a selected mailbox.
#[derive(Debug, Clone)]
pub struct Selected {
    /// The selected mailbox name.
    pub(crate) mailbox: Arc<str>,
}

impl Selected {
    /// Creates a new Selected state.
    #[must_use]
    pub fn new(mailbox: impl Into<Arc<str>>) -> Self {
        Self {
            mailbox: mailbox.into(),
        }
    }

    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_markers_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_state_accessors() {
        let selected = Selected::new("Archive");
        assert_eq!(selected.mailbox(), "Archive");
    }
}
