//! Per-stream runner: fetch → novelty filter → synthesize.
//!
//! A runner never propagates errors out of [`StreamRunner::run`]; every
//! failure mode reduces to a [`StreamOutcome::Failed`] variant so one
//! stream can never sink the cycle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use daybrief_fetch::StreamFetcher;
use daybrief_novelty::{filter_unseen, mark_all_seen, NoveltyStore};
use daybrief_shared::{CycleConfig, FailureKind, Result, StreamConfig, StreamOutcome};
use daybrief_synthesis::Synthesizer;

pub struct StreamRunner {
    stream: StreamConfig,
    fetcher: Arc<dyn StreamFetcher>,
    synthesizer: Arc<dyn Synthesizer>,
    store: Arc<dyn NoveltyStore>,
    fetch_timeout: Duration,
    synthesis_timeout: Duration,
}

impl StreamRunner {
    pub fn new(
        stream: StreamConfig,
        fetcher: Arc<dyn StreamFetcher>,
        synthesizer: Arc<dyn Synthesizer>,
        store: Arc<dyn NoveltyStore>,
        cycle: &CycleConfig,
    ) -> Self {
        Self {
            stream,
            fetcher,
            synthesizer,
            store,
            fetch_timeout: Duration::from_secs(cycle.fetch_timeout_secs),
            synthesis_timeout: Duration::from_secs(cycle.synthesis_timeout_secs),
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream.id
    }

    /// Run one cycle for this stream. Infallible by contract: failures are
    /// reported in the outcome, never as errors.
    #[instrument(skip_all, fields(stream = %self.stream.id))]
    pub async fn run(&self) -> StreamOutcome {
        let batch = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&self.stream))
            .await
        {
            Err(_) => {
                warn!(timeout_secs = self.fetch_timeout.as_secs(), "fetch timed out");
                return StreamOutcome::Failed(FailureKind::Timeout);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "fetch failed");
                return StreamOutcome::Failed(FailureKind::FetchFailed);
            }
            Ok(Ok(batch)) => batch,
        };

        for failure in &batch.partial_failures {
            warn!(source = %failure.source, error = %failure.message, "source degraded");
        }

        let unseen = match filter_unseen(self.store.as_ref(), batch.items).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "novelty store unavailable");
                return StreamOutcome::Failed(FailureKind::StoreUnavailable);
            }
        };

        if unseen.is_empty() {
            info!("no new items, quiet cycle");
            return StreamOutcome::Empty;
        }

        let synthesis = match tokio::time::timeout(
            self.synthesis_timeout,
            self.synthesizer.synthesize(&self.stream, &unseen),
        )
        .await
        {
            Err(_) => {
                warn!(
                    timeout_secs = self.synthesis_timeout.as_secs(),
                    "synthesis timed out"
                );
                return StreamOutcome::Failed(FailureKind::Timeout);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "synthesis failed");
                return StreamOutcome::Failed(FailureKind::SynthesisFailed);
            }
            Ok(Ok(s)) => s,
        };

        // Items are not committed on an empty synthesis, so they get another
        // shot next cycle alongside fresher material.
        if synthesis.is_empty() {
            info!(items = unseen.len(), "synthesis judged batch unpublishable");
            return StreamOutcome::Empty;
        }

        let identities = unseen.into_iter().map(|i| i.identity).collect();
        info!("stream produced content");
        StreamOutcome::Content {
            narrative: synthesis.narrative,
            source_links: synthesis.source_links,
            identities,
        }
    }

    /// Commit identities after the daily record is durably written.
    pub async fn commit_published(&self, identities: &[String]) -> Result<()> {
        mark_all_seen(self.store.as_ref(), identities, chrono::Utc::now()).await
    }
}
