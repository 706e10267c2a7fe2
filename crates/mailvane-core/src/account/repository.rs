//! Account storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;
use uuid::Uuid;

use super::credentials;
use super::model::{Account, AccountId, Security};
use crate::Result;

/// Repository for account storage and retrieval.
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
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
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL UNIQUE,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                security TEXT NOT NULL,
                username TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get all accounts, ordered by display name then email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, email, host, port, security, username
            FROM accounts
            ORDER BY name ASC, email ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let accounts = rows.iter().filter_map(row_to_account).collect();
        Ok(accounts)
    }

    /// Get account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, host, port, security, username
            FROM accounts
            WHERE id = ?
            ",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(row_to_account))
    }

    /// Save an account (insert or update).
    ///
    /// Passwords are not part of the record; store them with
    /// [`credentials::store_password`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn save(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO accounts (id, name, email, host, port, security, username)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                host = excluded.host,
                port = excluded.port,
                security = excluded.security,
                username = excluded.username,
                updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(account.id.0.to_string())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.host)
        .bind(i64::from(account.port))
        .bind(security_to_string(account.security))
        .bind(&account.username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete an account.
    ///
    /// Also removes the account's password from the system keyring; a
    /// failed keyring cleanup is logged, not fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;

        if let Err(e) = credentials::delete_password(id) {
            warn!("Failed to delete password from keyring: {e}");
        }

        Ok(())
    }
}

/// Convert a database row to an Account.
///
/// Rows with an unparsable id are dropped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Option<Account> {
    let id_text: String = row.get("id");
    let id = match Uuid::parse_str(&id_text) {
        Ok(uuid) => AccountId(uuid),
        Err(e) => {
            warn!("Skipping account row with invalid id {id_text:?}: {e}");
            return None;
        }
    };

    Some(Account {
        id,
        name: row.get("name"),
        email: row.get("email"),
        host: row.get("host"),
        port: row.get::<i64, _>("port") as u16,
        security: string_to_security(row.get("security")),
        username: row.get("username"),
    })
}

const fn security_to_string(security: Security) -> &'static str {
    match security {
        Security::None => "none",
        Security::Tls => "tls",
        Security::StartTls => "starttls",
    }
}

fn string_to_security(s: &str) -> Security {
    match s {
        "none" => Security::None,
        "starttls" => Security::StartTls,
        _ => Security::Tls,
    }
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
    use super::*;

    #[tokio::test]
    async fn test_create_and_retrieve_account() {
        let repo = AccountRepository::in_memory().await.unwrap();

        let account = Account::new("test@example.com", "imap.example.com");
        repo.save(&account).await.unwrap();

        let retrieved = repo.get(account.id).await.unwrap();
        assert_eq!(retrieved, Some(account));
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let repo = AccountRepository::in_memory().await.unwrap();
        let retrieved = repo.get(AccountId::new()).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let repo = AccountRepository::in_memory().await.unwrap();

        let mut account = Account::new("test@example.com", "imap.example.com");
        repo.save(&account).await.unwrap();

        account.name = "Work".to_string();
        account.port = 1143;
        account.security = Security::None;
        repo.save(&account).await.unwrap();

        let accounts = repo.list().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Work");
        assert_eq!(accounts[0].port, 1143);
        assert_eq!(accounts[0].security, Security::None);
    }

    #[tokio::test]
    async fn test_list_orders_by_name_then_email() {
        let repo = AccountRepository::in_memory().await.unwrap();

        let mut beta = Account::new("beta@example.com", "imap.example.com");
        beta.name = "Beta".to_string();
        let mut alpha = Account::new("alpha@example.com", "imap.example.com");
        alpha.name = "Alpha".to_string();

        repo.save(&beta).await.unwrap();
        repo.save(&alpha).await.unwrap();

        let accounts = repo.list().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Alpha");
        assert_eq!(accounts[1].name, "Beta");
    }

    #[tokio::test]
    async fn test_delete_account() {
        let repo = AccountRepository::in_memory().await.unwrap();

        let account = Account::new("test@example.com", "imap.example.com");
        repo.save(&account).await.unwrap();
        repo.delete(account.id).await.unwrap();

        assert_eq!(repo.get(account.id).await.unwrap(), None);
    }

    #[test]
    fn test_security_string_round_trip() {
        for security in [Security::None, Security::Tls, Security::StartTls] {
            assert_eq!(string_to_security(security_to_string(security)), security);
        }
        assert_eq!(string_to_security("garbage"), Security::Tls);
    }
}
