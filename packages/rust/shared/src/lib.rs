//! Shared types, error model, and configuration for Daybrief.
//!
//! This crate is the foundation depended on by all other Daybrief crates.
//! It provides:
//! - [`DaybriefError`] — the unified error type
//! - Domain types ([`Item`], [`StreamOutcome`], [`DailyRecord`], [`CycleSummary`])
//! - Configuration ([`AppConfig`], stream definitions, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CycleConfig, DeployConfig, FetchConfig, PathsConfig, PublishConfig, SourceConfig,
    SourceKind, StoreBackend, StreamConfig, SynthesisConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{DaybriefError, Result};
pub use types::{
    CURRENT_SCHEMA_VERSION, CycleSummary, DailyRecord, DaySection, FailureKind, Item, ItemPayload,
    OutcomeKind, RunId, SourceLink, StreamOutcome,
};
