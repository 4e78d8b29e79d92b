// SQLite-backed moderation store.
//
// Tables:
// - users: per-user violation counter and last violation time
// - admins: per-group alert recipients, keyed by (admin_id, group_id)
// - message_stats: per-group message / hate speech counters
//
// Every write is one upsert statement, so SQLite's own write lock makes each
// counter update atomic without any locking on our side.

use crate::core::moderation::{
    AdminRecord, AdminRegistry, GroupStats, StatsStore, StoreError, ViolationStore,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    /// Open (creating if needed) the database at `database_url` and run migrations.
    ///
    /// Accepts either a bare file path or a `sqlite:` URL.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                username TEXT,
                violation_count INTEGER DEFAULT 0,
                last_violation_date TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admins (
                admin_id TEXT,
                group_id TEXT,
                username TEXT,
                PRIMARY KEY (admin_id, group_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_stats (
                group_id TEXT PRIMARY KEY,
                total_messages INTEGER DEFAULT 0,
                hate_speech_messages INTEGER DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ViolationStore for SqliteModerationStore {
    async fn add_violation(&self, user_id: &str, username: &str) -> Result<u64, StoreError> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id, username, violation_count, last_violation_date)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                violation_count = COALESCE(violation_count, 0) + 1,
                last_violation_date = excluded.last_violation_date
            RETURNING violation_count
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        let count: i64 = row.get("violation_count");
        Ok(count as u64)
    }

    async fn get_violation_count(&self, user_id: &str) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT violation_count FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(row
            .and_then(|r| r.get::<Option<i64>, _>("violation_count"))
            .map(|count| count as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl StatsStore for SqliteModerationStore {
    async fn increment_message_stats(
        &self,
        group_id: &str,
        is_hate_speech: bool,
    ) -> Result<(), StoreError> {
        let hate = if is_hate_speech { 1i64 } else { 0i64 };

        sqlx::query(
            r#"
            INSERT INTO message_stats (group_id, total_messages, hate_speech_messages)
            VALUES (?, 1, ?)
            ON CONFLICT(group_id) DO UPDATE SET
                total_messages = COALESCE(total_messages, 0) + 1,
                hate_speech_messages = COALESCE(hate_speech_messages, 0) + excluded.hate_speech_messages
            "#,
        )
        .bind(group_id)
        .bind(hate)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get_stats(&self, group_id: &str) -> Result<GroupStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT total_messages, hate_speech_messages
            FROM message_stats
            WHERE group_id = ?
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(row
            .map(|r| GroupStats {
                total_messages: r.get::<Option<i64>, _>("total_messages").unwrap_or(0) as u64,
                hate_speech_messages: r
                    .get::<Option<i64>, _>("hate_speech_messages")
                    .unwrap_or(0) as u64,
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl AdminRegistry for SqliteModerationStore {
    async fn add_admin(
        &self,
        admin_id: &str,
        group_id: &str,
        username: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO admins (admin_id, group_id, username)
            VALUES (?, ?, ?)
            ON CONFLICT(admin_id, group_id) DO UPDATE SET
                username = excluded.username
            "#,
        )
        .bind(admin_id)
        .bind(group_id)
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn remove_admin(&self, admin_id: &str, group_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM admins WHERE admin_id = ? AND group_id = ?")
            .bind(admin_id)
            .bind(group_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn list_admins(&self, group_id: &str) -> Result<Vec<AdminRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT admin_id, group_id, username
            FROM admins
            WHERE group_id = ?
            ORDER BY admin_id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| AdminRecord {
                admin_id: row.get("admin_id"),
                group_id: row.get("group_id"),
                username: row
                    .get::<Option<String>, _>("username")
                    .unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, SqliteModerationStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moderation.db");
        let store = SqliteModerationStore::new(path.to_str().unwrap())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_violations_persist_and_count() {
        let (_dir, store) = open_store().await;

        assert_eq!(store.get_violation_count("u1").await.unwrap(), 0);
        for expected in 1..=3 {
            assert_eq!(store.add_violation("u1", "alice").await.unwrap(), expected);
        }
        assert_eq!(store.get_violation_count("u1").await.unwrap(), 3);

        let row = sqlx::query("SELECT username, last_violation_date FROM users WHERE user_id = ?")
            .bind("u1")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("username"), "alice");
        let stamp: String = row.get("last_violation_date");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_violations_are_not_lost() {
        let (_dir, store) = open_store().await;
        let store = Arc::new(store);
        let k = 32;

        let handles: Vec<_> = (0..k)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add_violation("u1", "alice").await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }

        assert_eq!(seen, (1..=k).collect::<HashSet<u64>>());
        assert_eq!(store.get_violation_count("u1").await.unwrap(), k);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stats_single_row() {
        let (_dir, store) = open_store().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .increment_message_stats("g1", i % 4 == 0)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get_stats("g1").await.unwrap().as_tuple(), (20, 5));
        let rows: i64 = sqlx::query("SELECT COUNT(*) AS n FROM message_stats")
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_stats_defaults_and_mix() {
        let (_dir, store) = open_store().await;

        assert_eq!(store.get_stats("unseen").await.unwrap().as_tuple(), (0, 0));

        store.increment_message_stats("g1", true).await.unwrap();
        store.increment_message_stats("g1", false).await.unwrap();
        assert_eq!(store.get_stats("g1").await.unwrap().as_tuple(), (2, 1));
    }

    #[tokio::test]
    async fn test_admin_upsert_and_remove() {
        let (_dir, store) = open_store().await;

        store.add_admin("a1", "g1", "old").await.unwrap();
        store.add_admin("a1", "g1", "new").await.unwrap();
        store.add_admin("a0", "g1", "zed").await.unwrap();

        let admins = store.list_admins("g1").await.unwrap();
        assert_eq!(
            admins,
            vec![
                AdminRecord {
                    admin_id: "a0".to_string(),
                    group_id: "g1".to_string(),
                    username: "zed".to_string(),
                },
                AdminRecord {
                    admin_id: "a1".to_string(),
                    group_id: "g1".to_string(),
                    username: "new".to_string(),
                },
            ]
        );

        store.remove_admin("ghost", "g1").await.unwrap();
        store.remove_admin("a1", "g1").await.unwrap();
        assert_eq!(store.list_admins("g1").await.unwrap().len(), 1);
        assert!(store.list_admins("g2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_pool_reports_storage_error() {
        let (_dir, store) = open_store().await;
        store.pool.close().await;

        match store.add_violation("u1", "alice").await {
            Err(StoreError::Storage(message)) => assert!(!message.is_empty()),
            other => panic!("expected a storage error, got {:?}", other),
        }
        assert!(store.get_stats("g1").await.is_err());
        assert!(store.list_admins("g1").await.is_err());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let (dir, store) = open_store().await;
        store.add_violation("u1", "alice").await.unwrap();
        drop(store);

        let path = dir.path().join("moderation.db");
        let reopened = SqliteModerationStore::new(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(reopened.get_violation_count("u1").await.unwrap(), 1);
    }
}
