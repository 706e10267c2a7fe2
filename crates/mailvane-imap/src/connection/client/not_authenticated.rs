//! Not-authenticated state operations.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::Result;
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a connected stream, consuming the greeting.
    ///
    /// The greeting line is read and discarded; a server that rejects
    /// the connection does so by closing it or failing the first command.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);
        let greeting = framed.read_line().await?;
        tracing::debug!(%greeting, "server greeting");

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            state: NotAuthenticated,
        })
    }

    /// Authenticates with LOGIN, transitioning to `Authenticated`.
    ///
    /// Username and password are serialized as quoted strings, so values
    /// containing spaces, quotes, or backslashes are safe.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        self.run_command(&Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;

        Ok(Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            state: Authenticated,
        })
    }
}
