//! Merge-and-publish: fold content outcomes into the daily record, rebuild
//! the site, and optionally deploy.
//!
//! Publication is idempotent per date: re-running a day overwrites its
//! record and the re-rendered site completely.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use daybrief_shared::{
    DailyRecord, DaySection, PathsConfig, Result, StreamConfig, StreamOutcome,
    CURRENT_SCHEMA_VERSION,
};
use daybrief_site::{load_history, render_site, save_record, Deployer};

use crate::coordinator::CombinedResult;

/// What a publish pass produced.
#[derive(Debug)]
pub struct PublishReport {
    /// Where the daily record was written.
    pub record_path: PathBuf,
    /// Sections in the published record.
    pub sections: usize,
    /// Day pages in the rebuilt site.
    pub days_rendered: usize,
    /// Whether the site was pushed to hosting.
    pub deployed: bool,
}

/// Publish one day: write the record, rebuild the site, deploy if a
/// deployer is supplied.
#[instrument(skip_all, fields(%date))]
pub async fn publish_day(
    date: NaiveDate,
    streams: &[StreamConfig],
    combined: &CombinedResult,
    paths: &PathsConfig,
    deployer: Option<&dyn Deployer>,
) -> Result<PublishReport> {
    // Sections in configured stream order; quiet and failed streams
    // contribute nothing.
    let sections: Vec<DaySection> = streams
        .iter()
        .filter_map(|stream| {
            combined
                .outcomes
                .iter()
                .find(|(id, _)| *id == stream.id)
                .and_then(|(_, outcome)| match outcome {
                    StreamOutcome::Content {
                        narrative,
                        source_links,
                        ..
                    } => Some(DaySection {
                        stream_id: stream.id.clone(),
                        title: stream.title.clone(),
                        narrative: narrative.clone(),
                        source_links: source_links.clone(),
                    }),
                    _ => None,
                })
        })
        .collect();

    let record = DailyRecord {
        schema_version: CURRENT_SCHEMA_VERSION,
        date,
        sections,
        created_at: Utc::now(),
    };

    let archive_dir = paths.archive_dir();
    let record_path = save_record(&archive_dir, &record)?;

    let history = load_history(&archive_dir)?;
    let days_rendered = render_site(&history, streams, &paths.site())?;

    let deployed = match deployer {
        Some(d) => {
            d.deploy(&paths.site()).await?;
            true
        }
        None => false,
    };

    info!(
        sections = record.sections.len(),
        days_rendered, deployed, "day published"
    );

    Ok(PublishReport {
        record_path,
        sections: record.sections.len(),
        days_rendered,
        deployed,
    })
}

/// Rebuild the static site from archive history alone, without running a
/// cycle. Backs the `build` command.
pub fn rebuild_site(paths: &PathsConfig, streams: &[StreamConfig]) -> Result<usize> {
    let history = load_history(&paths.archive_dir())?;
    render_site(&history, streams, &paths.site())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use daybrief_shared::{DaybriefError, FailureKind, SourceLink, StoreBackend};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn temp_paths() -> PathsConfig {
        let root = std::env::temp_dir().join(format!("db_publish_{}", Uuid::now_v7()));
        PathsConfig {
            data_dir: root.join("data").to_string_lossy().into_owned(),
            site_dir: root.join("site").to_string_lossy().into_owned(),
        }
    }

    fn streams() -> Vec<StreamConfig> {
        ["pure-signal", "maranello"]
            .iter()
            .map(|id| StreamConfig {
                id: (*id).into(),
                title: format!("Title {id}"),
                backend: StoreBackend::Json,
                persona: None,
                sources: vec![],
            })
            .collect()
    }

    fn content(narrative: &str) -> StreamOutcome {
        StreamOutcome::Content {
            narrative: narrative.into(),
            source_links: vec![SourceLink {
                title: "Post".into(),
                url: "https://example.com/post".into(),
            }],
            identities: vec!["abc".into()],
        }
    }

    struct CountingDeployer(AtomicUsize);

    #[async_trait]
    impl Deployer for CountingDeployer {
        async fn deploy(&self, _site_dir: &Path) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingDeployer;

    #[async_trait]
    impl Deployer for FailingDeployer {
        async fn deploy(&self, _site_dir: &Path) -> Result<()> {
            Err(DaybriefError::Deploy("wrangler exploded".into()))
        }
    }

    #[tokio::test]
    async fn publishes_content_streams_in_configured_order() {
        let paths = temp_paths();
        let date: NaiveDate = "2026-08-25".parse().unwrap();
        // Outcomes arrive reversed relative to configured order
        let combined = CombinedResult {
            outcomes: vec![
                ("maranello".into(), content("Ferrari news.")),
                ("pure-signal".into(), content("AI news.")),
            ],
        };

        let report = publish_day(date, &streams(), &combined, &paths, None)
            .await
            .expect("publish");
        assert_eq!(report.sections, 2);
        assert!(!report.deployed);

        let history = load_history(&paths.archive_dir()).unwrap();
        assert_eq!(history[0].sections[0].stream_id, "pure-signal");
        assert_eq!(history[0].sections[1].stream_id, "maranello");
    }

    #[tokio::test]
    async fn failed_and_quiet_streams_are_omitted() {
        let paths = temp_paths();
        let combined = CombinedResult {
            outcomes: vec![
                ("pure-signal".into(), content("AI news.")),
                ("maranello".into(), StreamOutcome::Failed(FailureKind::FetchFailed)),
            ],
        };

        let report = publish_day("2026-08-25".parse().unwrap(), &streams(), &combined, &paths, None)
            .await
            .expect("publish");
        assert_eq!(report.sections, 1);

        let history = load_history(&paths.archive_dir()).unwrap();
        assert!(history[0].section("maranello").is_none());
    }

    #[tokio::test]
    async fn rerun_overwrites_same_date() {
        let paths = temp_paths();
        let date: NaiveDate = "2026-08-25".parse().unwrap();

        let first = CombinedResult {
            outcomes: vec![("pure-signal".into(), content("First pass."))],
        };
        publish_day(date, &streams(), &first, &paths, None).await.unwrap();

        let second = CombinedResult {
            outcomes: vec![("pure-signal".into(), content("Second pass."))],
        };
        publish_day(date, &streams(), &second, &paths, None).await.unwrap();

        let history = load_history(&paths.archive_dir()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sections[0].narrative, "Second pass.");
    }

    #[tokio::test]
    async fn deployer_runs_once_after_render() {
        let paths = temp_paths();
        let combined = CombinedResult {
            outcomes: vec![("pure-signal".into(), content("News."))],
        };
        let deployer = CountingDeployer(AtomicUsize::new(0));

        let report = publish_day(
            "2026-08-25".parse().unwrap(),
            &streams(),
            &combined,
            &paths,
            Some(&deployer),
        )
        .await
        .expect("publish");
        assert!(report.deployed);
        assert_eq!(deployer.0.load(Ordering::SeqCst), 1);
        assert!(paths.site().join("index.html").exists());
    }

    #[tokio::test]
    async fn deploy_failure_propagates_after_record_written() {
        let paths = temp_paths();
        let combined = CombinedResult {
            outcomes: vec![("pure-signal".into(), content("News."))],
        };

        let err = publish_day(
            "2026-08-25".parse().unwrap(),
            &streams(),
            &combined,
            &paths,
            Some(&FailingDeployer),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DaybriefError::Deploy(_)));
        // Record and site survive; only the push failed
        assert!(!load_history(&paths.archive_dir()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rebuild_site_without_cycle() {
        let paths = temp_paths();
        let combined = CombinedResult {
            outcomes: vec![("pure-signal".into(), content("News."))],
        };
        publish_day("2026-08-25".parse().unwrap(), &streams(), &combined, &paths, None)
            .await
            .unwrap();

        std::fs::remove_dir_all(paths.site()).unwrap();
        let days = rebuild_site(&paths, &streams()).expect("rebuild");
        assert_eq!(days, 1);
        assert!(paths.site().join("index.html").exists());
    }
}
