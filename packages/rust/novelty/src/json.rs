//! Flat-file JSON novelty store.
//!
//! The whole set is held in memory and rewritten on every mark via
//! temp-file-then-rename, so a crash mid-write never leaves a torn file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use daybrief_shared::{DaybriefError, Result};

use crate::NoveltyStore;

/// On-disk layout of the JSON store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    /// Identity → first-seen timestamp (RFC 3339).
    seen: BTreeMap<String, String>,
    /// When the store was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

/// JSON-backed [`NoveltyStore`] with atomic replace on write.
pub struct JsonNoveltyStore {
    path: PathBuf,
    data: Mutex<StoreFile>,
}

impl JsonNoveltyStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DaybriefError::io(parent, e))?;
        }

        let data = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| DaybriefError::io(path, e))?;
            match serde_json::from_str(&content) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(?path, error = %e, "novelty store unreadable, starting fresh");
                    StoreFile::default()
                }
            }
        } else {
            StoreFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    /// Number of identities in the store.
    pub async fn len(&self) -> usize {
        self.data.lock().await.seen.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write the current set to disk via temp file + atomic rename.
    fn persist(&self, data: &StoreFile) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| DaybriefError::Store(format!("serialize store: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| DaybriefError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| DaybriefError::io(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl NoveltyStore for JsonNoveltyStore {
    async fn contains(&self, identity: &str) -> Result<bool> {
        Ok(self.data.lock().await.seen.contains_key(identity))
    }

    async fn mark_seen(&self, identity: &str, first_seen: DateTime<Utc>) -> Result<()> {
        let mut data = self.data.lock().await;
        if data.seen.contains_key(identity) {
            return Ok(());
        }
        data.seen
            .insert(identity.to_string(), first_seen.to_rfc3339());
        data.updated_at = Some(Utc::now().to_rfc3339());
        self.persist(&data)
    }

    async fn reset(&self) -> Result<()> {
        let mut data = self.data.lock().await;
        data.seen.clear();
        data.updated_at = Some(Utc::now().to_rfc3339());
        self.persist(&data)
    }
}
