#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Multi-account mail service with a persistent cache
//!
//! Adds (or reuses) an account, refreshes the inbox, and prints the
//! newest summaries. Run it twice: the second run seeds the view from
//! the local cache and only fetches messages newer than the cached
//! cursor.
//!
//! ## Running
//!
//! ```bash
//! cargo run --package mailvane-core --example sync_inbox
//! ```

use std::io::{self, Write};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use mailvane_core::{
    Account, AccountId, AccountRepository, CacheRepository, MailService, MessageSummary,
    SyncObserver,
};

struct StdoutObserver;

impl SyncObserver for StdoutObserver {
    fn cache_seeded(&self, _account_id: AccountId, mailbox: &str, summaries: &[MessageSummary]) {
        println!("  [sync] seeded {} cached summaries for {}", summaries.len(), mailbox);
    }

    fn cache_invalidated(&self, _account_id: AccountId, mailbox: &str) {
        println!("  [sync] cache for {} invalidated by the server", mailbox);
    }

    fn refresh_completed(
        &self,
        _account_id: AccountId,
        mailbox: &str,
        summaries: &[MessageSummary],
    ) {
        println!("  [sync] {} now holds {} summaries", mailbox, summaries.len());
    }

    fn stale_discarded(&self, _account_id: AccountId, mailbox: &str) {
        println!("  [sync] discarded a stale refresh of {}", mailbox);
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailvane_core=debug,mailvane_imap=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("Mailvane - Inbox Sync Demo");
    println!("==========================\n");

    let accounts = AccountRepository::new("mailvane-accounts.db").await?;
    let cache = CacheRepository::new("mailvane-cache.db").await?;
    let service = MailService::new(accounts, cache).with_observer(StdoutObserver);

    let host = prompt("IMAP host")?;
    let email = prompt("Email address")?;

    let account = match service
        .list_accounts()
        .await?
        .into_iter()
        .find(|a| a.email == email)
    {
        Some(existing) => {
            println!("Using stored account {}", existing.display_title());
            existing
        }
        None => {
            let password = prompt("Password")?;
            let account = Account::new(email.as_str(), host.as_str());
            service.add_account(&account, &password).await?;
            println!("Account saved; password stored in the system keyring");
            account
        }
    };

    service.select_account(account.id).await?;
    println!("\nRefreshing INBOX...");
    service.refresh_inbox().await?;

    println!("\nNewest messages:");
    for summary in service.summaries().iter().take(10) {
        let date = summary.date.map_or_else(
            || "unknown date".to_string(),
            |d| d.format("%Y-%m-%d %H:%M").to_string(),
        );
        println!("  [{}] {} - {}", date, summary.from, summary.subject);
    }

    if let Some(body) = service.selected_body(mailvane_core::INBOX).await? {
        let excerpt: String = body.chars().take(200).collect();
        println!("\nSelected message body starts:\n{}", excerpt);
    }

    println!("\nRun again to watch the cache seed the view instantly.");
    Ok(())
}
