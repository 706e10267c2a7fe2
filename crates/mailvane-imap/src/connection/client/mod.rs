//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful SELECT
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, ResponseAccumulator, ResponsePart};
use crate::command::{Command, TagGenerator};
use crate::parser;
use crate::types::{MailboxStatus, Uid, UidValidity};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile
/// time; the field of that type carries whatever runtime data the state
/// needs (the selected mailbox name, for `Selected`).
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) state: State,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Runs one command to completion and returns the response parts.
    ///
    /// Writes the tagged command, then consumes lines and literals until
    /// the completion line for the tag arrives. Only the command keyword
    /// is logged; arguments may carry credentials.
    pub(crate) async fn run_command(&mut self, command: &Command) -> Result<Vec<ResponsePart>> {
        let tag = self.tag_gen.next();
        tracing::trace!(%tag, command = command.name(), "sending command");

        let bytes = command.serialize(&tag);
        self.stream.write_command(&bytes).await?;

        let mut accumulator = ResponseAccumulator::new(&tag);
        let parts = accumulator.read_until_tagged(&mut self.stream).await?;
        Self::check_completion(&parts, &tag)?;

        Ok(parts)
    }

    /// Checks that the completion line reports `OK`.
    pub(crate) fn check_completion(parts: &[ResponsePart], tag: &str) -> Result<()> {
        // The tagged line is the last one by construction; scan from the
        // rear so a literal that happens to end the vector is skipped.
        for part in parts.iter().rev() {
            if let ResponsePart::Line(line) = part {
                if line
                    .strip_prefix(tag)
                    .is_some_and(|rest| rest.starts_with(' '))
                {
                    if parser::tagged_ok(line, tag) {
                        return Ok(());
                    }
                    return Err(Error::CommandFailed { line: line.clone() });
                }
            }
        }

        Err(Error::Parse("missing tagged completion".to_string()))
    }

    /// Issues STATUS for a mailbox and parses its UID counters.
    ///
    /// Counters the server omits stay `None`; a reported 0 is treated
    /// as absent.
    pub(crate) async fn status_inner(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        let parts = self
            .run_command(&Command::Status {
                mailbox: mailbox.to_string(),
            })
            .await?;

        let mut status = MailboxStatus::new();
        for part in &parts {
            let ResponsePart::Line(line) = part else {
                continue;
            };
            if !line.starts_with("* STATUS") {
                continue;
            }
            if let Some(value) = parser::status_value(line, "UIDVALIDITY") {
                status.uid_validity = UidValidity::new(value);
            }
            if let Some(value) = parser::status_value(line, "UIDNEXT") {
                status.uid_next = Uid::new(value);
            }
        }

        Ok(status)
    }

    /// Issues LIST and returns mailbox names, deduplicated and sorted.
    pub(crate) async fn list_inner(&mut self) -> Result<Vec<String>> {
        let parts = self.run_command(&Command::List).await?;

        let mut names = Vec::new();
        for part in &parts {
            let ResponsePart::Line(line) = part else {
                continue;
            };
            if !line.starts_with("* LIST") {
                continue;
            }
            if let Some(name) = parser::list_mailbox_name(line) {
                names.push(name);
            }
        }

        names.sort_unstable();
        names.dedup();
        Ok(names)
    }
}
