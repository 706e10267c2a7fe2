//! Selected state operations.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Selected;
use crate::Result;
use crate::command::Command;
use crate::connection::framed::ResponsePart;
use crate::fetch::{self, FetchedMessage};
use crate::parser;
use crate::types::{MailboxStatus, Uid};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.state.mailbox()
    }

    /// Selects a different mailbox, replacing the current selection.
    pub async fn select(mut self, mailbox: &str) -> Result<Self> {
        self.run_command(&Command::Select {
            mailbox: mailbox.to_string(),
        })
        .await?;

        Ok(Self {
            stream: self.stream,
            tag_gen: self.tag_gen,
            state: Selected::new(mailbox),
        })
    }

    /// Lists all mailbox names, deduplicated and lexicographically sorted.
    pub async fn list(&mut self) -> Result<Vec<String>> {
        self.list_inner().await
    }

    /// Queries UIDNEXT and UIDVALIDITY for a mailbox.
    pub async fn status(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.status_inner(mailbox).await
    }

    /// Searches all UIDs in the selected mailbox.
    ///
    /// UIDs come back in the order the server reports them, ascending in
    /// practice. An empty mailbox yields an empty vector.
    pub async fn uid_search_all(&mut self) -> Result<Vec<Uid>> {
        let parts = self.run_command(&Command::UidSearchAll).await?;
        Ok(Self::search_result(&parts))
    }

    /// Searches a UID range, open-ended when `end` is `None`.
    pub async fn uid_search_range(&mut self, start: Uid, end: Option<Uid>) -> Result<Vec<Uid>> {
        let parts = self
            .run_command(&Command::UidSearchRange { start, end })
            .await?;
        Ok(Self::search_result(&parts))
    }

    /// Fetches header fields for a batch of UIDs.
    ///
    /// UIDs the server does not answer for are omitted from the result.
    /// An empty batch issues no command.
    pub async fn fetch_headers(&mut self, uids: &[Uid]) -> Result<Vec<FetchedMessage>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let parts = self
            .run_command(&Command::UidFetchHeaders {
                uids: uids.to_vec(),
                preview: false,
            })
            .await?;
        Ok(fetch::collect_messages(&parts))
    }

    /// Fetches header fields plus a bounded body excerpt for a batch of UIDs.
    pub async fn fetch_headers_with_preview(
        &mut self,
        uids: &[Uid],
    ) -> Result<Vec<FetchedMessage>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let parts = self
            .run_command(&Command::UidFetchHeaders {
                uids: uids.to_vec(),
                preview: true,
            })
            .await?;
        Ok(fetch::collect_messages(&parts))
    }

    /// Fetches the full body text of one message.
    pub async fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>> {
        let parts = self.run_command(&Command::UidFetchBody { uid }).await?;
        fetch::single_literal(&parts, uid)
    }

    /// Takes the last untagged SEARCH line; servers may emit several.
    fn search_result(parts: &[ResponsePart]) -> Vec<Uid> {
        let mut result = None;
        for part in parts {
            if let ResponsePart::Line(line) = part {
                if let Some(uids) = parser::search_uids(line) {
                    result = Some(uids);
                }
            }
        }
        result.unwrap_or_default()
    }
}
