//! Embedded libSQL novelty store.
//!
//! Idempotence comes from `INSERT OR IGNORE` on a primary-keyed table;
//! crash-safety from the database's own transactional writes. Migrations
//! run on open and are versioned through a `schema_migrations` table.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};

use daybrief_shared::{DaybriefError, Result};

use crate::NoveltyStore;

/// A schema migration with a version and SQL statements.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations, in ascending version order.
fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: seen identities",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per published identity; never mutated, never pruned
CREATE TABLE IF NOT EXISTS seen (
    identity   TEXT PRIMARY KEY,
    first_seen TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}

/// libSQL-backed [`NoveltyStore`].
pub struct SqliteNoveltyStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl SqliteNoveltyStore {
    /// Open or create a store database at `path`, running pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DaybriefError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DaybriefError::Store(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DaybriefError::Store(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DaybriefError::Store(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Number of identities in the store.
    pub async fn len(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM seen", params![])
            .await
            .map_err(|e| DaybriefError::Store(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<u64>(0)
                .map_err(|e| DaybriefError::Store(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(DaybriefError::Store(e.to_string())),
        }
    }
}

#[async_trait]
impl NoveltyStore for SqliteNoveltyStore {
    async fn contains(&self, identity: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM seen WHERE identity = ?1", params![identity])
            .await
            .map_err(|e| DaybriefError::Store(e.to_string()))?;

        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(DaybriefError::Store(e.to_string())),
        }
    }

    async fn mark_seen(&self, identity: &str, first_seen: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO seen (identity, first_seen) VALUES (?1, ?2)",
                params![identity, first_seen.to_rfc3339()],
            )
            .await
            .map_err(|e| DaybriefError::Store(e.to_string()))?;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM seen", params![])
            .await
            .map_err(|e| DaybriefError::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp store for testing.
    async fn test_store() -> SqliteNoveltyStore {
        let tmp = std::env::temp_dir().join(format!("db_sqlite_store_{}.db", Uuid::now_v7()));
        SqliteNoveltyStore::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("db_sqlite_store_{}.db", Uuid::now_v7()));
        let _s1 = SqliteNoveltyStore::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = SqliteNoveltyStore::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn mark_and_contains() {
        let store = test_store().await;
        assert!(!store.contains("abc123").await.unwrap());

        store.mark_seen("abc123", Utc::now()).await.expect("mark");
        assert!(store.contains("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn mark_seen_is_idempotent_and_keeps_first_timestamp() {
        let store = test_store().await;
        let first = Utc::now();

        store.mark_seen("abc", first).await.unwrap();
        store
            .mark_seen("abc", first + chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.len().await.unwrap(), 1);

        let mut rows = store
            .conn
            .query("SELECT first_seen FROM seen WHERE identity = 'abc'", params![])
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), first.to_rfc3339());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let tmp = std::env::temp_dir().join(format!("db_sqlite_store_{}.db", Uuid::now_v7()));
        {
            let store = SqliteNoveltyStore::open(&tmp).await.expect("first open");
            store.mark_seen("persisted", Utc::now()).await.unwrap();
        }
        let store = SqliteNoveltyStore::open(&tmp).await.expect("second open");
        assert!(store.contains("persisted").await.unwrap());
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let store = test_store().await;
        store.mark_seen("a", Utc::now()).await.unwrap();
        store.mark_seen("b", Utc::now()).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);

        store.reset().await.expect("reset");
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
