//! Error types for Daybrief.
//!
//! Library crates use [`DaybriefError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! Stream-local failures (fetch, synthesis, store) are reduced to a
//! `StreamOutcome::Failed` at the runner boundary and never abort a cycle;
//! publish and deploy failures are fatal to the cycle.

use std::path::PathBuf;

/// Top-level error type for all Daybrief operations.
#[derive(Debug, thiserror::Error)]
pub enum DaybriefError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Stream fetch error (all sources for a stream failed).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Synthesis error (API, auth, quota, or malformed response).
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Novelty store read/write failure. Never treated as "no new items".
    #[error("novelty store error: {0}")]
    Store(String),

    /// Daily record write or site render failure — fatal to the cycle.
    #[error("publish error: {0}")]
    Publish(String),

    /// Deploy capability failure — fatal to the cycle.
    #[error("deploy error: {0}")]
    Deploy(String),

    /// Another cycle holds the run lock.
    #[error("cycle locked: {message}")]
    CycleLocked { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DaybriefError>;

impl DaybriefError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a cycle-locked error from any displayable message.
    pub fn locked(msg: impl Into<String>) -> Self {
        Self::CycleLocked {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
