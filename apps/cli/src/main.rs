//! Daybrief CLI — daily digest orchestrator.
//!
//! Fetches configured streams, filters for novelty, synthesizes narratives,
//! and publishes the day to a static site.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
