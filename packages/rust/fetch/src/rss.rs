//! RSS/Atom source fetching via `feed-rs`.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use daybrief_shared::{DaybriefError, Item, ItemPayload, Result};

use crate::derive_identity;

/// Fetch one feed and convert its fresh entries to items.
pub(crate) async fn fetch(
    client: &reqwest::Client,
    feed_url: &str,
    source_name: &str,
    stream_id: &str,
    lookback_hours: u32,
) -> Result<Vec<Item>> {
    let resp = client
        .get(feed_url)
        .send()
        .await
        .map_err(|e| DaybriefError::Fetch(format!("{feed_url}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DaybriefError::Fetch(format!("{feed_url}: HTTP {status}")));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| DaybriefError::Fetch(format!("{feed_url}: {e}")))?;

    let cutoff = Utc::now() - Duration::hours(i64::from(lookback_hours));
    parse_entries(&bytes, source_name, stream_id, cutoff)
}

/// Parse feed bytes into items, dropping entries older than `cutoff`.
/// Entries with no timestamp are kept.
fn parse_entries(
    bytes: &[u8],
    source_name: &str,
    stream_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Item>> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| DaybriefError::Fetch(format!("{source_name}: feed parse: {e}")))?;

    let mut items = Vec::new();
    for entry in feed.entries {
        let Some(url) = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))
        else {
            debug!(source = source_name, "skipping entry without link");
            continue;
        };

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        if let Some(date) = published {
            if date < cutoff {
                continue;
            }
        }

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".into());

        let body = entry
            .summary
            .map(|s| clean_html(&s.content))
            .unwrap_or_default();

        items.push(Item {
            stream_id: stream_id.to_string(),
            identity: derive_identity(&title, &url),
            payload: ItemPayload {
                title,
                source_name: source_name.to_string(),
                url,
                published,
                body,
            },
        });
    }

    // Newest-first; undated entries last
    items.sort_by(|a, b| b.payload.published.cmp(&a.payload.published));
    Ok(items)
}

/// Strip markup from a feed summary, collapsing whitespace.
fn clean_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = scraper::Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}
