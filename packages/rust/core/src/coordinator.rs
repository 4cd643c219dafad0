//! Parallel stream coordination.
//!
//! Each runner executes in its own task; a panicked or cancelled task is
//! reduced to `Failed(Internal)` so the cycle always receives exactly one
//! outcome per configured stream, in configured order.

use std::sync::Arc;

use tracing::{error, info, instrument};

use daybrief_shared::{FailureKind, StreamOutcome};

use crate::runner::StreamRunner;

/// Per-stream outcomes for one cycle, in configured stream order.
pub struct CombinedResult {
    pub outcomes: Vec<(String, StreamOutcome)>,
}

impl CombinedResult {
    /// Whether at least one stream produced publishable content.
    pub fn any_content(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| matches!(o, StreamOutcome::Content { .. }))
    }
}

/// Run every stream concurrently and gather their outcomes.
#[instrument(skip_all, fields(streams = runners.len()))]
pub async fn run_all(runners: &[Arc<StreamRunner>]) -> CombinedResult {
    let handles: Vec<_> = runners
        .iter()
        .map(|runner| {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run().await })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (runner, handle) in runners.iter().zip(handles) {
        let id = runner.stream_id().to_string();
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(stream = %id, error = %e, "stream task aborted");
                StreamOutcome::Failed(FailureKind::Internal)
            }
        };
        info!(stream = %id, outcome = %outcome.kind(), "stream finished");
        outcomes.push((id, outcome));
    }

    CombinedResult { outcomes }
}
