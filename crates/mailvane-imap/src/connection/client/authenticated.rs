//! Authenticated state operations.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::Command;
use crate::types::MailboxStatus;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox, transitioning to `Selected`.
    pub async fn select(mut self, mailbox: &str) -> Result<Client<S, Selected>> {
        self.run_command(&Command::Select {
            mailbox: mailbox.to_string(),
        })
        .await?;

        Ok(Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            state: Selected::new(mailbox),
        })
    }

    /// Lists all mailbox names, deduplicated and lexicographically sorted.
    pub async fn list(&mut self) -> Result<Vec<String>> {
        self.list_inner().await
    }

    /// Queries UIDNEXT and UIDVALIDITY for a mailbox without selecting it.
    pub async fn status(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.status_inner(mailbox).await
    }
}
