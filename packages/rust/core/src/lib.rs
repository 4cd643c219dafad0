//! Cycle orchestration for Daybrief.
//!
//! This crate ties fetching, novelty filtering, synthesis, and publication
//! into the end-to-end daily cycle: fault-isolated stream runners in
//! parallel, then a single merge-and-publish step, then deferred novelty
//! commits.

pub mod coordinator;
pub mod cycle;
pub mod lock;
pub mod publisher;
pub mod runner;

pub use coordinator::CombinedResult;
pub use cycle::{run_cycle, CycleOptions, CycleProgress, SilentProgress};
pub use lock::RunLock;
pub use publisher::{publish_day, rebuild_site, PublishReport};
pub use runner::StreamRunner;
