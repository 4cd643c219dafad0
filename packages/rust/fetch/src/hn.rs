//! Hacker News front-page source via the Algolia search API.
//!
//! Stories are filtered by a freshness window, ranked by
//! `points + 1.5 × comments`, and truncated to the configured count.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;

use daybrief_shared::{DaybriefError, FetchConfig, Item, ItemPayload, Result};

use crate::derive_identity;

/// Algolia front-page endpoint.
const FRONT_PAGE_URL: &str =
    "https://hn.algolia.com/api/v1/search_by_date?tags=front_page&hitsPerPage=60";

#[derive(Debug, Deserialize)]
struct FrontPage {
    hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    num_comments: Option<i64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl Hit {
    /// Ranking score: points + 1.5 × comments.
    fn score(&self) -> f64 {
        let points = self.points.unwrap_or(0) as f64;
        let comments = self.num_comments.unwrap_or(0) as f64;
        points + comments * 1.5
    }
}

/// Fetch the current front page and convert the top stories to items.
pub(crate) async fn fetch(
    client: &reqwest::Client,
    stream_id: &str,
    config: &FetchConfig,
) -> Result<Vec<Item>> {
    let resp = client
        .get(FRONT_PAGE_URL)
        .send()
        .await
        .map_err(|e| DaybriefError::Fetch(format!("hn front page: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DaybriefError::Fetch(format!("hn front page: HTTP {status}")));
    }

    let page: FrontPage = resp
        .json()
        .await
        .map_err(|e| DaybriefError::Fetch(format!("hn front page: {e}")))?;

    info!(hits = page.hits.len(), "fetched HN front page");
    let selected = select_stories(page.hits, Utc::now(), config);
    Ok(selected
        .into_iter()
        .map(|hit| to_item(hit, stream_id))
        .collect())
}

/// Filter by freshness, rank by score, and truncate to the top count.
fn select_stories(hits: Vec<Hit>, now: DateTime<Utc>, config: &FetchConfig) -> Vec<Hit> {
    let cutoff = now - Duration::hours(i64::from(config.hn_freshness_hours));

    let mut fresh: Vec<Hit> = hits
        .into_iter()
        .filter(|h| h.title.is_some())
        // Stories with no timestamp are kept
        .filter(|h| h.created_at.map(|c| c >= cutoff).unwrap_or(true))
        .collect();

    fresh.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fresh.truncate(config.hn_top_count);
    fresh
}

/// Convert a selected hit into a stream item.
fn to_item(hit: Hit, stream_id: &str) -> Item {
    let title = hit.title.unwrap_or_default();
    // Ask HN and similar have no external URL; link to the discussion
    let url = hit
        .url
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", hit.object_id));

    let points = hit.points.unwrap_or(0);
    let comments = hit.num_comments.unwrap_or(0);

    Item {
        stream_id: stream_id.to_string(),
        identity: derive_identity(&title, &url),
        payload: ItemPayload {
            title,
            source_name: "Hacker News".into(),
            url,
            published: hit.created_at,
            body: format!("{points} points, {comments} comments on Hacker News"),
        },
    }
}
