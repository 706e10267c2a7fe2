//! Mailbox cache storage repository.
//!
//! Two tables: `mailbox_caches` holds one row per (account, mailbox) with
//! the sync counters, `cached_summaries` holds the per-UID rows. Saving an
//! entry replaces both atomically.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::warn;
use uuid::Uuid;

use super::model::{MailboxCache, MessageSummary};
use crate::Result;
use crate::account::AccountId;

/// Repository for mailbox cache storage and retrieval.
pub struct CacheRepository {
    pool: SqlitePool,
}

impl CacheRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS mailbox_caches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id TEXT NOT NULL,
                mailbox TEXT NOT NULL,
                uid_validity INTEGER,
                uid_next INTEGER,
                last_updated TEXT NOT NULL,
                UNIQUE(account_id, mailbox)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS cached_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id TEXT NOT NULL,
                mailbox TEXT NOT NULL,
                uid INTEGER NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                from_addr TEXT NOT NULL DEFAULT '',
                date TEXT,
                preview TEXT,
                UNIQUE(account_id, mailbox, uid)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_summaries_mailbox
            ON cached_summaries(account_id, mailbox)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the cache entry for a mailbox, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load(&self, account_id: AccountId, mailbox: &str) -> Result<Option<MailboxCache>> {
        let meta = sqlx::query(
            r"
            SELECT uid_validity, uid_next, last_updated
            FROM mailbox_caches
            WHERE account_id = ? AND mailbox = ?
            ",
        )
        .bind(account_id.0.to_string())
        .bind(mailbox)
        .fetch_optional(&self.pool)
        .await?;

        let Some(meta) = meta else {
            return Ok(None);
        };

        let last_updated_text: String = meta.get("last_updated");
        let Some(last_updated) = parse_utc(&last_updated_text) else {
            warn!("Dropping cache entry for {mailbox:?} with unparsable timestamp");
            return Ok(None);
        };

        let rows = sqlx::query(
            r"
            SELECT uid, subject, from_addr, date, preview
            FROM cached_summaries
            WHERE account_id = ? AND mailbox = ?
            ORDER BY uid DESC
            ",
        )
        .bind(account_id.0.to_string())
        .bind(mailbox)
        .fetch_all(&self.pool)
        .await?;

        let summaries = rows.iter().map(row_to_summary).collect();

        Ok(Some(MailboxCache {
            account_id,
            mailbox: mailbox.to_string(),
            uid_validity: read_counter(&meta, "uid_validity"),
            uid_next: read_counter(&meta, "uid_next"),
            summaries,
            last_updated,
        }))
    }

    /// Save a cache entry, replacing any previous entry for the same
    /// (account, mailbox) key. The metadata row and all summary rows are
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database transaction fails.
    pub async fn save(&self, cache: &MailboxCache) -> Result<()> {
        let account_id = cache.account_id.0.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO mailbox_caches (account_id, mailbox, uid_validity, uid_next, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(account_id, mailbox) DO UPDATE SET
                uid_validity = excluded.uid_validity,
                uid_next = excluded.uid_next,
                last_updated = excluded.last_updated
            ",
        )
        .bind(&account_id)
        .bind(&cache.mailbox)
        .bind(cache.uid_validity.map(i64::from))
        .bind(cache.uid_next.map(i64::from))
        .bind(cache.last_updated.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query(r"DELETE FROM cached_summaries WHERE account_id = ? AND mailbox = ?")
            .bind(&account_id)
            .bind(&cache.mailbox)
            .execute(&mut *tx)
            .await?;

        for summary in &cache.summaries {
            sqlx::query(
                r"
                INSERT INTO cached_summaries (account_id, mailbox, uid, subject, from_addr, date, preview)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(account_id, mailbox, uid) DO UPDATE SET
                    subject = excluded.subject,
                    from_addr = excluded.from_addr,
                    date = excluded.date,
                    preview = excluded.preview
                ",
            )
            .bind(&account_id)
            .bind(&cache.mailbox)
            .bind(i64::from(summary.uid))
            .bind(&summary.subject)
            .bind(&summary.from)
            .bind(summary.date.map(|d| d.to_rfc3339()))
            .bind(&summary.preview)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete the cache entry for a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, account_id: AccountId, mailbox: &str) -> Result<()> {
        let account_id = account_id.0.to_string();

        sqlx::query(r"DELETE FROM mailbox_caches WHERE account_id = ? AND mailbox = ?")
            .bind(&account_id)
            .bind(mailbox)
            .execute(&self.pool)
            .await?;

        sqlx::query(r"DELETE FROM cached_summaries WHERE account_id = ? AND mailbox = ?")
            .bind(&account_id)
            .bind(mailbox)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete all cache entries for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_account(&self, account_id: AccountId) -> Result<()> {
        let account_id = account_id.0.to_string();

        sqlx::query(r"DELETE FROM mailbox_caches WHERE account_id = ?")
            .bind(&account_id)
            .execute(&self.pool)
            .await?;

        sqlx::query(r"DELETE FROM cached_summaries WHERE account_id = ?")
            .bind(&account_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Read an optional non-zero counter column. Zero is not a meaningful
/// UID or UIDVALIDITY, so it is treated as absent.
fn read_counter(row: &SqliteRow, column: &str) -> Option<u32> {
    let value: Option<i64> = row.get(column);
    value.and_then(|v| u32::try_from(v).ok()).filter(|&v| v != 0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_summary(row: &SqliteRow) -> MessageSummary {
    let date_text: Option<String> = row.get("date");
    MessageSummary {
        uid: row.get::<i64, _>("uid") as u32,
        subject: row.get("subject"),
        from: row.get("from_addr"),
        date: date_text.and_then(|d| DateTime::parse_from_rfc3339(&d).ok()),
        preview: row.get("preview"),
    }
}

fn parse_utc(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::unreadable_literal,
    clippy::similar_names
)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn summary(uid: u32, subject: &str) -> MessageSummary {
        MessageSummary {
            uid,
            subject: subject.to_string(),
            from: "Alice <alice@example.com>".to_string(),
            date: Some(
                DateTime::parse_from_rfc2822("Mon, 01 Jan 2024 10:00:00 +0200").unwrap(),
            ),
            preview: Some("Hello there".to_string()),
        }
    }

    fn cache_entry(account_id: AccountId, summaries: Vec<MessageSummary>) -> MailboxCache {
        MailboxCache {
            account_id,
            mailbox: "INBOX".to_string(),
            uid_validity: Some(42),
            uid_next: Some(100),
            summaries,
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let loaded = repo.load(AccountId::new(), "INBOX").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let account_id = AccountId::new();

        let entry = cache_entry(account_id, vec![summary(5, "first"), summary(9, "second")]);
        repo.save(&entry).await.unwrap();

        let loaded = repo.load(account_id, "INBOX").await.unwrap().unwrap();
        assert_eq!(loaded.uid_validity, Some(42));
        assert_eq!(loaded.uid_next, Some(100));
        assert_eq!(loaded.summaries.len(), 2);

        // Rows come back newest-UID first.
        assert_eq!(loaded.summaries[0].uid, 9);
        assert_eq!(loaded.summaries[0].subject, "second");
        assert_eq!(loaded.summaries[1].uid, 5);

        // The parsed date keeps its original offset.
        let date = loaded.summaries[0].date.unwrap();
        assert_eq!(date.offset(), &FixedOffset::east_opt(2 * 3600).unwrap());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_entry() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let account_id = AccountId::new();

        repo.save(&cache_entry(
            account_id,
            vec![summary(1, "old"), summary(2, "old")],
        ))
        .await
        .unwrap();

        let mut replacement = cache_entry(account_id, vec![summary(3, "new")]);
        replacement.uid_next = Some(4);
        repo.save(&replacement).await.unwrap();

        let loaded = repo.load(account_id, "INBOX").await.unwrap().unwrap();
        assert_eq!(loaded.uid_next, Some(4));
        assert_eq!(loaded.summaries.len(), 1);
        assert_eq!(loaded.summaries[0].uid, 3);
    }

    #[tokio::test]
    async fn test_entries_are_keyed_by_account_and_mailbox() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let first = AccountId::new();
        let second = AccountId::new();

        repo.save(&cache_entry(first, vec![summary(1, "a")]))
            .await
            .unwrap();
        let mut archive = cache_entry(first, vec![summary(2, "b")]);
        archive.mailbox = "Archive".to_string();
        repo.save(&archive).await.unwrap();
        repo.save(&cache_entry(second, vec![summary(3, "c")]))
            .await
            .unwrap();

        let inbox = repo.load(first, "INBOX").await.unwrap().unwrap();
        assert_eq!(inbox.summaries[0].uid, 1);
        let archive = repo.load(first, "Archive").await.unwrap().unwrap();
        assert_eq!(archive.summaries[0].uid, 2);
        let other = repo.load(second, "INBOX").await.unwrap().unwrap();
        assert_eq!(other.summaries[0].uid, 3);
    }

    #[tokio::test]
    async fn test_absent_fields_survive_round_trip() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let account_id = AccountId::new();

        let entry = MailboxCache {
            account_id,
            mailbox: "INBOX".to_string(),
            uid_validity: None,
            uid_next: None,
            summaries: vec![MessageSummary {
                uid: 7,
                subject: String::new(),
                from: String::new(),
                date: None,
                preview: None,
            }],
            last_updated: Utc::now(),
        };
        repo.save(&entry).await.unwrap();

        let loaded = repo.load(account_id, "INBOX").await.unwrap().unwrap();
        assert_eq!(loaded.uid_validity, None);
        assert_eq!(loaded.uid_next, None);
        assert_eq!(loaded.summaries[0].date, None);
        assert_eq!(loaded.summaries[0].preview, None);
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let account_id = AccountId::new();

        repo.save(&cache_entry(account_id, vec![summary(1, "a")]))
            .await
            .unwrap();
        repo.delete(account_id, "INBOX").await.unwrap();

        assert!(repo.load(account_id, "INBOX").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_account_removes_all_mailboxes() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let doomed = AccountId::new();
        let kept = AccountId::new();

        repo.save(&cache_entry(doomed, vec![summary(1, "a")]))
            .await
            .unwrap();
        let mut archive = cache_entry(doomed, vec![summary(2, "b")]);
        archive.mailbox = "Archive".to_string();
        repo.save(&archive).await.unwrap();
        repo.save(&cache_entry(kept, vec![summary(3, "c")]))
            .await
            .unwrap();

        repo.delete_account(doomed).await.unwrap();

        assert!(repo.load(doomed, "INBOX").await.unwrap().is_none());
        assert!(repo.load(doomed, "Archive").await.unwrap().is_none());
        assert!(repo.load(kept, "INBOX").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_counters_load_as_absent() {
        let repo = CacheRepository::in_memory().await.unwrap();
        let account_id = AccountId::new();

        let entry = MailboxCache {
            account_id,
            mailbox: "INBOX".to_string(),
            uid_validity: Some(0),
            uid_next: Some(0),
            summaries: Vec::new(),
            last_updated: Utc::now(),
        };
        repo.save(&entry).await.unwrap();

        let loaded = repo.load(account_id, "INBOX").await.unwrap().unwrap();
        assert_eq!(loaded.uid_validity, None);
        assert_eq!(loaded.uid_next, None);
    }
}
