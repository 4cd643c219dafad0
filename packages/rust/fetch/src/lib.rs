//! Stream fetching — gathers raw items from a stream's configured sources.
//!
//! Partial source failure is tolerated and reported alongside the surviving
//! items; the fetch as a whole fails only if zero sources succeeded.

mod hn;
mod rss;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{info, warn};

use daybrief_shared::{DaybriefError, FetchConfig, Item, Result, SourceKind, StreamConfig};

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("Daybrief/", env!("CARGO_PKG_VERSION"));

/// Everything one fetch pass could gather for a stream.
#[derive(Debug, Default)]
pub struct FetchBatch {
    /// Items gathered across all surviving sources, newest-first.
    pub items: Vec<Item>,
    /// Sources that failed this pass.
    pub partial_failures: Vec<SourceError>,
}

/// One failed source within an otherwise-successful fetch.
#[derive(Debug, Clone)]
pub struct SourceError {
    /// Source display name.
    pub source: String,
    /// What went wrong.
    pub message: String,
}

/// Capability consumed by the stream runner: fetch raw items for a stream.
#[async_trait]
pub trait StreamFetcher: Send + Sync {
    /// Gather whatever the stream's sources can provide. Errors only if
    /// zero sources succeeded.
    async fn fetch(&self, stream: &StreamConfig) -> Result<FetchBatch>;
}

/// Stable dedup key for an item: first 16 hex chars of sha256 of `title|url`.
pub fn derive_identity(title: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// HTTP-backed [`StreamFetcher`] over RSS/Atom feeds and the Hacker News
/// Algolia API, with a politeness delay between successive source requests.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
    last_request: Mutex<Option<Instant>>,
}

impl HttpFetcher {
    /// Build a fetcher from the `[fetch]` config section.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DaybriefError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    /// Wait out the configured delay since the previous source request.
    async fn rate_limit(&self) {
        let delay = Duration::from_millis(self.config.rate_limit_ms);
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl StreamFetcher for HttpFetcher {
    async fn fetch(&self, stream: &StreamConfig) -> Result<FetchBatch> {
        let mut results = Vec::with_capacity(stream.sources.len());

        for source in &stream.sources {
            self.rate_limit().await;

            let result = match source.kind {
                // Validated at config load; a misconfigured source that
                // slips through degrades instead of failing the stream.
                SourceKind::Rss => match source.url.as_deref() {
                    Some(url) => {
                        rss::fetch(
                            &self.client,
                            url,
                            &source.name,
                            &stream.id,
                            self.config.lookback_hours,
                        )
                        .await
                    }
                    None => Err(DaybriefError::Fetch(format!(
                        "rss source '{}' has no url",
                        source.name
                    ))),
                },
                SourceKind::Hn => hn::fetch(&self.client, &stream.id, &self.config).await,
            };

            results.push((source.name.clone(), result));
        }

        merge_source_results(&stream.id, results)
    }
}

/// Fold per-source results into one batch: failures become recorded partial
/// failures, and the fetch as a whole errors only if every source failed.
fn merge_source_results(
    stream_id: &str,
    results: Vec<(String, Result<Vec<Item>>)>,
) -> Result<FetchBatch> {
    let total = results.len();
    let mut batch = FetchBatch::default();
    let mut succeeded = 0usize;

    for (source, result) in results {
        match result {
            Ok(items) => {
                succeeded += 1;
                info!(stream = %stream_id, source = %source, items = items.len(), "source fetched");
                batch.items.extend(items);
            }
            Err(e) => {
                warn!(stream = %stream_id, source = %source, error = %e, "source failed");
                batch.partial_failures.push(SourceError {
                    source,
                    message: e.to_string(),
                });
            }
        }
    }

    if succeeded == 0 && total > 0 {
        return Err(DaybriefError::Fetch(format!(
            "all {total} sources failed for stream '{stream_id}'"
        )));
    }

    // Newest-first; undated items sink to the end
    batch
        .items
        .sort_by(|a, b| b.payload.published.cmp(&a.payload.published));

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use daybrief_shared::ItemPayload;

    fn item(identity: &str, hours_ago: Option<i64>) -> Item {
        Item {
            stream_id: "pure-signal".into(),
            identity: identity.into(),
            payload: ItemPayload {
                title: identity.to_uppercase(),
                source_name: "src".into(),
                url: format!("https://example.com/{identity}"),
                published: hours_ago.map(|h| Utc::now() - Duration::hours(h)),
                body: String::new(),
            },
        }
    }

    #[test]
    fn one_failed_source_degrades_to_partial_failure() {
        let batch = merge_source_results(
            "pure-signal",
            vec![
                ("Feed A".into(), Ok(vec![item("a", Some(1))])),
                ("Feed B".into(), Err(DaybriefError::Fetch("HTTP 500".into()))),
            ],
        )
        .expect("fetch survives one failed source");

        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.partial_failures.len(), 1);
        assert_eq!(batch.partial_failures[0].source, "Feed B");
        assert!(batch.partial_failures[0].message.contains("HTTP 500"));
    }

    #[test]
    fn all_sources_failing_is_a_fetch_error() {
        let result = merge_source_results(
            "pure-signal",
            vec![
                ("Feed A".into(), Err(DaybriefError::Fetch("timeout".into()))),
                ("Feed B".into(), Err(DaybriefError::Fetch("HTTP 500".into()))),
            ],
        );
        match result {
            Err(DaybriefError::Fetch(msg)) => assert!(msg.contains("all 2 sources failed")),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn merged_items_sorted_newest_first_across_sources() {
        let batch = merge_source_results(
            "pure-signal",
            vec![
                ("Feed A".into(), Ok(vec![item("old", Some(20)), item("undated", None)])),
                ("Feed B".into(), Ok(vec![item("new", Some(1))])),
            ],
        )
        .expect("merge");

        let ids: Vec<&str> = batch.items.iter().map(|i| i.identity.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
        assert!(batch.partial_failures.is_empty());
    }

    #[test]
    fn no_sources_yields_empty_batch() {
        let batch = merge_source_results("pure-signal", vec![]).expect("empty stream");
        assert!(batch.items.is_empty());
        assert!(batch.partial_failures.is_empty());
    }

    #[test]
    fn identity_is_stable() {
        let a = derive_identity("Title", "https://example.com/a");
        let b = derive_identity("Title", "https://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identity_differs_by_title_and_url() {
        let base = derive_identity("Title", "https://example.com/a");
        assert_ne!(base, derive_identity("Other", "https://example.com/a"));
        assert_ne!(base, derive_identity("Title", "https://example.com/b"));
    }

    #[test]
    fn identity_separator_prevents_collisions() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(derive_identity("ab", "c"), derive_identity("a", "bc"));
    }
}
