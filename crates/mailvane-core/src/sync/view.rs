//! In-memory mailbox view state.

use crate::cache::MessageSummary;

/// The currently displayed summary list and selection.
///
/// Summaries are kept in display order (newest first). The selection
/// tracks a UID rather than an index so it survives list updates.
#[derive(Debug, Clone, Default)]
pub struct MailboxView {
    summaries: Vec<MessageSummary>,
    selected: Option<u32>,
}

impl MailboxView {
    /// Creates an empty view.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            summaries: Vec::new(),
            selected: None,
        }
    }

    /// The displayed summaries, newest first.
    #[must_use]
    pub fn summaries(&self) -> &[MessageSummary] {
        &self.summaries
    }

    /// UID of the selected summary, if any.
    #[must_use]
    pub const fn selected_uid(&self) -> Option<u32> {
        self.selected
    }

    /// Whether the view currently shows no summaries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Replaces the displayed summaries.
    ///
    /// A selection pointing at a UID no longer present is cleared.
    pub fn set_summaries(&mut self, summaries: Vec<MessageSummary>) {
        self.summaries = summaries;
        if let Some(uid) = self.selected
            && !self.summaries.iter().any(|s| s.uid == uid)
        {
            self.selected = None;
        }
    }

    /// Selects the summary with the given UID, if it is displayed.
    pub fn select(&mut self, uid: u32) {
        if self.summaries.iter().any(|s| s.uid == uid) {
            self.selected = Some(uid);
        }
    }

    /// Selects the newest (first displayed) summary when nothing is
    /// selected yet.
    pub fn select_newest_if_none(&mut self) {
        if self.selected.is_none() {
            self.selected = self.summaries.first().map(|s| s.uid);
        }
    }

    /// Clears both the summaries and the selection.
    pub fn clear(&mut self) {
        self.summaries.clear();
        self.selected = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary(uid: u32) -> MessageSummary {
        MessageSummary {
            uid,
            subject: format!("msg {uid}"),
            from: String::new(),
            date: None,
            preview: None,
        }
    }

    #[test]
    fn new_view_is_empty() {
        let view = MailboxView::new();
        assert!(view.is_empty());
        assert_eq!(view.selected_uid(), None);
    }

    #[test]
    fn select_newest_picks_first_displayed() {
        let mut view = MailboxView::new();
        view.set_summaries(vec![summary(9), summary(3)]);

        view.select_newest_if_none();
        assert_eq!(view.selected_uid(), Some(9));

        // Selection sticks once made.
        view.select(3);
        view.select_newest_if_none();
        assert_eq!(view.selected_uid(), Some(3));
    }

    #[test]
    fn select_ignores_unknown_uid() {
        let mut view = MailboxView::new();
        view.set_summaries(vec![summary(1)]);

        view.select(99);
        assert_eq!(view.selected_uid(), None);
    }

    #[test]
    fn replacing_summaries_prunes_dangling_selection() {
        let mut view = MailboxView::new();
        view.set_summaries(vec![summary(1), summary(2)]);
        view.select(1);

        view.set_summaries(vec![summary(2), summary(3)]);
        assert_eq!(view.selected_uid(), None);

        view.select_newest_if_none();
        assert_eq!(view.selected_uid(), Some(2));
    }

    #[test]
    fn selection_survives_update_when_still_present() {
        let mut view = MailboxView::new();
        view.set_summaries(vec![summary(1), summary(2)]);
        view.select(2);

        view.set_summaries(vec![summary(2), summary(3)]);
        assert_eq!(view.selected_uid(), Some(2));
    }

    #[test]
    fn clear_resets_everything() {
        let mut view = MailboxView::new();
        view.set_summaries(vec![summary(1)]);
        view.select(1);

        view.clear();
        assert!(view.is_empty());
        assert_eq!(view.selected_uid(), None);
    }
}
