//! Durable key-value persistence backed by SQLite
//!
//! The store holds a handful of fixed keys: the serialized conversation map
//! and the last-visit timestamp. Values are opaque strings; callers own the
//! serialization.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Key holding the whole conversation map, serialized as JSON.
pub const CONVERSATIONS_KEY: &str = "conversations";

/// Key holding the last-visit timestamp as epoch milliseconds.
pub const LAST_VISIT_KEY: &str = "last_visit";

pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    /// Open (or create) the database at the given path.
    pub async fn new(db_path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Write a value, replacing any previous one. Last write wins.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_round_trip() {
        tokio_test::block_on(async {
            let store = KvStore::new_in_memory().await.unwrap();

            assert_eq!(store.get("missing").await.unwrap(), None);

            store.put(CONVERSATIONS_KEY, "{}").await.unwrap();
            assert_eq!(
                store.get(CONVERSATIONS_KEY).await.unwrap().as_deref(),
                Some("{}")
            );
        });
    }

    #[tokio::test]
    async fn put_overwrites_previous_value() {
        let store = KvStore::new_in_memory().await.unwrap();

        store.put(LAST_VISIT_KEY, "1000").await.unwrap();
        store.put(LAST_VISIT_KEY, "2000").await.unwrap();

        assert_eq!(
            store.get(LAST_VISIT_KEY).await.unwrap().as_deref(),
            Some("2000")
        );
    }
}
