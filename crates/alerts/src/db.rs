//! SQLite store for per-chat preferences.

use crate::config::ChatPrefs;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

type PrefsRow = (
    i64,
    bool,
    i32,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    String,
);

const SELECT_PREFS: &str = "SELECT chat_id, authenticated, failed_auth, telegram_user, telegram_name, default_pair, calc_type, disabled_tags FROM chat_users";

fn from_row(row: PrefsRow) -> ChatPrefs {
    let (
        chat_id,
        authenticated,
        failed_auth,
        telegram_user,
        telegram_name,
        default_pair,
        calc_type,
        disabled_tags_json,
    ) = row;
    ChatPrefs {
        chat_id,
        authenticated,
        failed_auth,
        telegram_user,
        telegram_name,
        default_pair,
        calc_type,
        disabled_tags: serde_json::from_str(&disabled_tags_json).unwrap_or_default(),
    }
}

/// Database connection for chat preferences.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Every connection to `:memory:` is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_users (
                chat_id INTEGER PRIMARY KEY,
                authenticated INTEGER NOT NULL DEFAULT 0,
                failed_auth INTEGER NOT NULL DEFAULT 0,
                telegram_user TEXT,
                telegram_name TEXT,
                default_pair TEXT NOT NULL DEFAULT 'tBTCUSD',
                calc_type TEXT,
                disabled_tags TEXT NOT NULL DEFAULT '[]',
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Preferences of a chat, if it ever talked to the bot.
    pub async fn get(&self, chat_id: i64) -> Result<Option<ChatPrefs>, DbError> {
        let row = sqlx::query_as::<_, PrefsRow>(&format!("{} WHERE chat_id = ?", SELECT_PREFS))
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(from_row))
    }

    /// Get or create preferences for a chat.
    pub async fn get_or_create(&self, chat_id: i64) -> Result<ChatPrefs, DbError> {
        if let Some(prefs) = self.get(chat_id).await? {
            return Ok(prefs);
        }

        let prefs = ChatPrefs::new(chat_id);
        sqlx::query("INSERT INTO chat_users (chat_id, default_pair) VALUES (?, ?)")
            .bind(chat_id)
            .bind(&prefs.default_pair)
            .execute(&self.pool)
            .await?;

        Ok(prefs)
    }

    /// Update preferences.
    pub async fn update(&self, prefs: &ChatPrefs) -> Result<(), DbError> {
        let disabled_tags_json = serde_json::to_string(&prefs.disabled_tags).unwrap_or_default();

        sqlx::query(
            r#"
            UPDATE chat_users
            SET authenticated = ?, failed_auth = ?, telegram_user = ?, telegram_name = ?,
                default_pair = ?, calc_type = ?, disabled_tags = ?, updated_at = CURRENT_TIMESTAMP
            WHERE chat_id = ?
            "#,
        )
        .bind(prefs.authenticated)
        .bind(prefs.failed_auth)
        .bind(&prefs.telegram_user)
        .bind(&prefs.telegram_name)
        .bind(&prefs.default_pair)
        .bind(&prefs.calc_type)
        .bind(&disabled_tags_json)
        .bind(prefs.chat_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All chats that passed `/auth`.
    pub async fn authenticated_chats(&self) -> Result<Vec<ChatPrefs>, DbError> {
        let rows = sqlx::query_as::<_, PrefsRow>(&format!(
            "{} WHERE authenticated = 1 ORDER BY chat_id",
            SELECT_PREFS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfxgram_core::TypeTag;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_database_connect() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let prefs = db.get_or_create(123456).await.unwrap();
        assert_eq!(prefs, ChatPrefs::new(123456));
        assert_eq!(db.get(123456).await.unwrap(), Some(prefs));
        assert_eq!(db.get(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_prefs() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let mut prefs = db.get_or_create(123456).await.unwrap();

        prefs.authenticated = true;
        prefs.telegram_user = Some("satoshi".to_string());
        prefs.calc_type = Some("margin_base".to_string());
        prefs.disable(&[TypeTag::PositionUpdate, TypeTag::OrderNew]);
        db.update(&prefs).await.unwrap();

        let updated = db.get_or_create(123456).await.unwrap();
        assert_eq!(updated, prefs);
        assert_eq!(updated.disabled_tags, vec!["on", "pu"]);
    }

    #[tokio::test]
    async fn test_authenticated_chats() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        for chat_id in [3, 1, 2] {
            let mut prefs = db.get_or_create(chat_id).await.unwrap();
            prefs.authenticated = chat_id != 2;
            db.update(&prefs).await.unwrap();
        }

        let chats: Vec<i64> = db
            .authenticated_chats()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.chat_id)
            .collect();
        assert_eq!(chats, vec![1, 3]);
    }
}
