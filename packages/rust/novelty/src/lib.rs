//! Per-stream novelty stores — the persistent record of identities already
//! published.
//!
//! Two interchangeable backends provide identical observable semantics:
//! a flat persisted JSON set ([`JsonNoveltyStore`]) and an embedded libSQL
//! database ([`SqliteNoveltyStore`]). Backend selection is per-stream
//! configuration, not a contract difference. Stores are disjoint across
//! streams; each is owned by its stream for the duration of a cycle.

mod json;
mod sqlite;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use daybrief_shared::{Item, Result, StoreBackend};

pub use json::JsonNoveltyStore;
pub use sqlite::SqliteNoveltyStore;

/// Persistent set of previously-published item identities for one stream.
///
/// `mark_seen` is idempotent: marking an already-seen identity is a no-op
/// and never alters the original first-seen timestamp. `reset` is for
/// explicit operator action only, never called by normal runs.
#[async_trait]
pub trait NoveltyStore: Send + Sync {
    /// Whether `identity` has already been published.
    async fn contains(&self, identity: &str) -> Result<bool>;

    /// Record `identity` as published. No-op if already present.
    async fn mark_seen(&self, identity: &str, first_seen: DateTime<Utc>) -> Result<()>;

    /// Clear all records for the stream.
    async fn reset(&self) -> Result<()>;
}

/// Open the configured backend for one stream.
///
/// JSON stores live at `<dir>/<stream_id>.json`, sqlite stores at
/// `<dir>/<stream_id>.db`.
pub async fn open_store(
    backend: StoreBackend,
    dir: &Path,
    stream_id: &str,
) -> Result<Arc<dyn NoveltyStore>> {
    match backend {
        StoreBackend::Json => {
            let store = JsonNoveltyStore::open(&dir.join(format!("{stream_id}.json")))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Sqlite => {
            let store = SqliteNoveltyStore::open(&dir.join(format!("{stream_id}.db"))).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Drop items whose identity is already in the store, preserving order.
pub async fn filter_unseen(store: &dyn NoveltyStore, items: Vec<Item>) -> Result<Vec<Item>> {
    let total = items.len();
    let mut unseen = Vec::new();
    for item in items {
        if !store.contains(&item.identity).await? {
            unseen.push(item);
        }
    }
    tracing::info!(total, unseen = unseen.len(), "filtered items against novelty store");
    Ok(unseen)
}

/// Mark a batch of identities as seen with a single shared timestamp.
pub async fn mark_all_seen(
    store: &dyn NoveltyStore,
    identities: &[String],
    first_seen: DateTime<Utc>,
) -> Result<()> {
    for identity in identities {
        store.mark_seen(identity, first_seen).await?;
    }
    tracing::info!(count = identities.len(), "marked identities as seen");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybrief_shared::ItemPayload;
    use uuid::Uuid;

    fn item(identity: &str) -> Item {
        Item {
            stream_id: "test".into(),
            identity: identity.into(),
            payload: ItemPayload {
                title: identity.to_uppercase(),
                source_name: "src".into(),
                url: format!("https://example.com/{identity}"),
                published: None,
                body: String::new(),
            },
        }
    }

    #[tokio::test]
    async fn filter_preserves_order_and_drops_seen() {
        let path = std::env::temp_dir().join(format!("db_novelty_{}.json", Uuid::now_v7()));
        let store = JsonNoveltyStore::open(&path).expect("open");
        store.mark_seen("b", Utc::now()).await.expect("mark");

        let unseen = filter_unseen(&store, vec![item("a"), item("b"), item("c")])
            .await
            .expect("filter");
        let ids: Vec<&str> = unseen.iter().map(|i| i.identity.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn mark_all_seen_batch() {
        let path = std::env::temp_dir().join(format!("db_novelty_{}.json", Uuid::now_v7()));
        let store = JsonNoveltyStore::open(&path).expect("open");

        let ids = vec!["x".to_string(), "y".to_string()];
        mark_all_seen(&store, &ids, Utc::now()).await.expect("mark batch");
        assert!(store.contains("x").await.unwrap());
        assert!(store.contains("y").await.unwrap());
        assert!(!store.contains("z").await.unwrap());
    }

    #[tokio::test]
    async fn open_store_selects_backend() {
        let dir = std::env::temp_dir().join(format!("db_novelty_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let json = open_store(StoreBackend::Json, &dir, "a").await.expect("json");
        json.mark_seen("1", Utc::now()).await.unwrap();
        assert!(json.contains("1").await.unwrap());

        let sqlite = open_store(StoreBackend::Sqlite, &dir, "b").await.expect("sqlite");
        sqlite.mark_seen("2", Utc::now()).await.unwrap();
        assert!(sqlite.contains("2").await.unwrap());
        assert!(dir.join("a.json").exists());
        assert!(dir.join("b.db").exists());
    }
}
