#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Log in to an IMAP server and peek at the inbox
//!
//! Connects with implicit TLS, lists mailboxes, selects INBOX, and fetches
//! headers for the ten most recent messages.
//!
//! ## Running
//!
//! ```bash
//! cargo run --package mailvane-imap --example login_inbox
//! ```

use mailvane_imap::{Client, Config};
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Mailvane - IMAP Login Test");
    println!("==========================\n");

    print!("IMAP host: ");
    io::stdout().flush()?;
    let mut host = String::new();
    io::stdin().read_line(&mut host)?;
    let host = host.trim();

    print!("Email address: ");
    io::stdout().flush()?;
    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    let email = email.trim();

    print!("Password: ");
    io::stdout().flush()?;
    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim();

    println!("\nConnecting to {}:993...", host);

    let config = Config::new(host);
    let stream = mailvane_imap::connection::connect(&config).await?;
    println!("✓ Connected");

    println!("Authenticating as {}...", email);
    let client = Client::from_stream(stream).await?;
    let mut client = client.login(email, password).await?;
    println!("✓ Authenticated successfully!\n");

    println!("Mailboxes:");
    let names = client.list().await?;
    for name in &names {
        println!("  - {}", name);
    }

    let mut client = client.select("INBOX").await?;
    let uids = client.uid_search_all().await?;
    println!("\nINBOX holds {} messages", uids.len());

    let recent: Vec<_> = uids.iter().rev().take(10).rev().copied().collect();
    let messages = client.fetch_headers(&recent).await?;
    for message in &messages {
        println!("  UID {}: {} header bytes", message.uid, message.headers.len());
    }

    Ok(())
}
