//! Synthesis — turns a batch of new items into a narrative digest.
//!
//! The core consumes the [`Synthesizer`] capability; [`AnthropicSynthesizer`]
//! is the shipped implementation over the Anthropic Messages API.

mod anthropic;

use async_trait::async_trait;

use daybrief_shared::{Item, Result, SourceLink, StreamConfig};

pub use anthropic::AnthropicSynthesizer;

/// A synthesized digest for one stream, one cycle.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    /// Narrative text (small Markdown subset). Empty means the model judged
    /// the batch to contain nothing worth publishing.
    pub narrative: String,
    /// Source articles drawn from, in narrative order.
    pub source_links: Vec<SourceLink>,
}

impl Synthesis {
    /// Whether the synthesis produced publishable content.
    pub fn is_empty(&self) -> bool {
        self.narrative.trim().is_empty()
    }
}

/// Capability consumed by the stream runner: synthesize new items into prose.
///
/// Errors on any unrecoverable failure (auth, quota, malformed response);
/// the runner reduces those to `Failed(SynthesisFailed)`.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `items` into a digest for `stream`.
    async fn synthesize(&self, stream: &StreamConfig, items: &[Item]) -> Result<Synthesis>;
}
