//! Core domain types for the Daybrief digest pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the daily record format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for cycle run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A unit of content from one stream.
///
/// `identity` is the sole dedup key and is stable across runs for the same
/// logical item; the payload may vary run-to-run without affecting dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Owning stream identifier (e.g., `pure-signal`).
    pub stream_id: String,
    /// Stable dedup key (first 16 hex chars of sha256 of `title|url`).
    pub identity: String,
    /// Raw content carried into synthesis.
    pub payload: ItemPayload,
}

/// Raw item content needed for synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPayload {
    /// Item title.
    pub title: String,
    /// Name of the source it came from (e.g., feed name).
    pub source_name: String,
    /// Canonical item URL.
    pub url: String,
    /// Published timestamp, when the source provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    /// Body text (summary or excerpt), already stripped of markup.
    pub body: String,
}

// ---------------------------------------------------------------------------
// StreamOutcome
// ---------------------------------------------------------------------------

/// Why a stream's cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Zero sources succeeded during fetch.
    FetchFailed,
    /// The synthesis capability returned an unrecoverable error.
    SynthesisFailed,
    /// Fetch or synthesis exceeded its configured timeout.
    Timeout,
    /// Novelty store read/write failed.
    StoreUnavailable,
    /// The runner task itself panicked or was cancelled.
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FetchFailed => "fetch failed",
            Self::SynthesisFailed => "synthesis failed",
            Self::Timeout => "timeout",
            Self::StoreUnavailable => "store unavailable",
            Self::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

/// A link back to a source article included in a synthesized narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    /// Short descriptive title.
    pub title: String,
    /// Original article URL.
    pub url: String,
}

/// Result of running one stream for one cycle. Exactly one variant per
/// cycle per stream; owned by the coordinator and not persisted beyond
/// the daily record.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    /// No new items this cycle.
    Empty,
    /// New items were synthesized into a narrative.
    Content {
        /// The synthesized narrative (small Markdown subset).
        narrative: String,
        /// Source articles drawn from, in narrative order.
        source_links: Vec<SourceLink>,
        /// Dedup keys of every item included in the synthesis. Committed to
        /// the novelty store only after the daily record is durably written.
        identities: Vec<String>,
    },
    /// The stream's cycle failed; other streams are unaffected.
    Failed(FailureKind),
}

impl StreamOutcome {
    /// Collapse to the summary-level kind.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Empty => OutcomeKind::Empty,
            Self::Content { .. } => OutcomeKind::Content,
            Self::Failed(k) => OutcomeKind::Failed(*k),
        }
    }
}

/// Summary-level view of a stream outcome, reported in [`CycleSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Empty,
    Content,
    Failed(FailureKind),
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "quiet"),
            Self::Content => write!(f, "content"),
            Self::Failed(k) => write!(f, "failed ({k})"),
        }
    }
}

// ---------------------------------------------------------------------------
// DailyRecord
// ---------------------------------------------------------------------------

/// One stream's contribution to a published day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySection {
    /// Contributing stream identifier.
    pub stream_id: String,
    /// Display title for the section (e.g., "Pure Signal").
    pub title: String,
    /// Synthesized narrative text.
    pub narrative: String,
    /// Source articles, in narrative order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_links: Vec<SourceLink>,
}

/// The published artifact for one calendar day, persisted as
/// `archive/YYYY-MM-DD.json`. Re-running a day overwrites its record
/// completely; history is otherwise append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Publication date in the configured publication offset.
    pub date: NaiveDate,
    /// One section per stream whose outcome was `Content`, in configured
    /// stream order.
    pub sections: Vec<DaySection>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl DailyRecord {
    /// Look up the section contributed by a given stream, if any.
    pub fn section(&self, stream_id: &str) -> Option<&DaySection> {
        self.sections.iter().find(|s| s.stream_id == stream_id)
    }
}

// ---------------------------------------------------------------------------
// CycleSummary
// ---------------------------------------------------------------------------

/// Outward report of one cycle: per-stream outcomes in configured order and
/// whether a publish happened. A cycle that completes is a success even if
/// individual streams failed.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// Unique identifier for this run.
    pub run_id: RunId,
    /// The publication date this cycle ran for.
    pub date: NaiveDate,
    /// Per-stream outcome kinds, in configured order.
    pub outcomes: Vec<(String, OutcomeKind)>,
    /// Whether a daily record was written.
    pub published: bool,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}
