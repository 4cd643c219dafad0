//! The daily cycle: lock, run streams, publish, commit novelty.
//!
//! Commit ordering is the heart of the novelty guarantee: identities reach
//! the stores only after the daily record is durably written, so a failed
//! publish leaves every item eligible for the next cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use daybrief_fetch::StreamFetcher;
use daybrief_novelty::open_store;
use daybrief_shared::{
    AppConfig, CycleSummary, DaybriefError, OutcomeKind, Result, RunId, StreamOutcome,
};
use daybrief_site::Deployer;
use daybrief_synthesis::Synthesizer;

use crate::coordinator;
use crate::lock::RunLock;
use crate::publisher;
use crate::runner::StreamRunner;

/// Per-invocation knobs for one cycle.
#[derive(Debug, Clone)]
pub struct CycleOptions {
    /// The publication date to run for.
    pub date: NaiveDate,
    /// Run everything except the deploy step.
    pub dry_run: bool,
}

/// Progress callback for reporting cycle status.
pub trait CycleProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each stream finishes.
    fn stream_done(&self, stream_id: &str, outcome: &OutcomeKind);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl CycleProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stream_done(&self, _stream_id: &str, _outcome: &OutcomeKind) {}
}

/// Run one full cycle for `opts.date`.
///
/// A completed cycle is a success even when individual streams failed; the
/// summary carries the per-stream outcomes. Errors are reserved for
/// cycle-level faults: a held lock, a failed publish, a failed deploy.
#[instrument(skip_all, fields(date = %opts.date, dry_run = opts.dry_run))]
pub async fn run_cycle(
    config: &AppConfig,
    opts: &CycleOptions,
    fetcher: Arc<dyn StreamFetcher>,
    synthesizer: Arc<dyn Synthesizer>,
    deployer: Option<Arc<dyn Deployer>>,
    progress: &dyn CycleProgress,
) -> Result<CycleSummary> {
    let start = Instant::now();
    let run_id = RunId::new();

    if config.streams.is_empty() {
        return Err(DaybriefError::validation("no streams configured"));
    }

    info!(%run_id, streams = config.streams.len(), "starting cycle");

    let lock = RunLock::acquire(
        &config.paths.lock_path(),
        &run_id,
        config.cycle.lock_ttl_secs,
    )?;

    // --- Phase 1: novelty stores ---
    progress.phase("Opening novelty stores");
    let novelty_dir = config.paths.novelty_dir();
    std::fs::create_dir_all(&novelty_dir).map_err(|e| DaybriefError::io(&novelty_dir, e))?;

    let mut runners: Vec<Arc<StreamRunner>> = Vec::with_capacity(config.streams.len());
    for stream in &config.streams {
        let store = open_store(stream.backend, &novelty_dir, &stream.id).await?;
        runners.push(Arc::new(StreamRunner::new(
            stream.clone(),
            fetcher.clone(),
            synthesizer.clone(),
            store,
            &config.cycle,
        )));
    }

    // --- Phase 2: streams, in parallel ---
    progress.phase("Running streams");
    let combined = coordinator::run_all(&runners).await;
    for (id, outcome) in &combined.outcomes {
        progress.stream_done(id, &outcome.kind());
    }

    // --- Phase 3: publish, or short-circuit ---
    let published = if combined.any_content() {
        progress.phase("Publishing");
        let deployer = if opts.dry_run {
            info!("dry run, skipping deploy");
            None
        } else {
            deployer
        };
        publisher::publish_day(
            opts.date,
            &config.streams,
            &combined,
            &config.paths,
            deployer.as_deref(),
        )
        .await?;

        // --- Phase 4: deferred novelty commit ---
        progress.phase("Committing novelty");
        for (runner, (_, outcome)) in runners.iter().zip(&combined.outcomes) {
            if let StreamOutcome::Content { identities, .. } = outcome {
                // The record is already durable; a commit failure only means
                // this stream may republish the same items tomorrow.
                if let Err(e) = runner.commit_published(identities).await {
                    warn!(stream = %runner.stream_id(), error = %e, "novelty commit failed");
                }
            }
        }
        true
    } else {
        info!("no stream produced content, skipping publish");
        false
    };

    lock.release()?;

    let summary = CycleSummary {
        run_id,
        date: opts.date,
        outcomes: combined
            .outcomes
            .iter()
            .map(|(id, o)| (id.clone(), o.kind()))
            .collect(),
        published,
        elapsed: start.elapsed(),
    };

    info!(
        run_id = %summary.run_id,
        published = summary.published,
        elapsed_ms = summary.elapsed.as_millis(),
        "cycle complete"
    );

    Ok(summary)
}
