//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use daybrief_core::{run_cycle, CycleOptions, CycleProgress};
use daybrief_fetch::HttpFetcher;
use daybrief_novelty::open_store;
use daybrief_shared::{
    init_config, load_config, load_config_from, validate_api_key, AppConfig, OutcomeKind,
};
use daybrief_site::{load_history, Deployer, WranglerDeployer};
use daybrief_synthesis::AnthropicSynthesizer;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Daybrief — one synthesized digest per day, per stream.
#[derive(Parser)]
#[command(
    name = "daybrief",
    version,
    about = "Fetch, synthesize, and publish a daily digest from configured content streams.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.daybrief/daybrief.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one full cycle: fetch, synthesize, publish, deploy.
    Run {
        /// Publication date (YYYY-MM-DD). Defaults to today in the
        /// configured publication offset.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Run everything except the deploy step.
        #[arg(long)]
        dry_run: bool,
    },

    /// Rebuild the static site from archive history without fetching.
    Build,

    /// Clear one stream's novelty store.
    Reset {
        /// Stream ID to reset.
        #[arg(long)]
        stream: String,

        /// Skip the confirmation check.
        #[arg(long)]
        yes: bool,
    },

    /// List published days from the archive.
    History,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "daybrief=info",
        1 => "daybrief=debug",
        _ => "daybrief=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Run { date, dry_run } => cmd_run(config_path.as_deref(), date, dry_run).await,
        Command::Build => cmd_build(config_path.as_deref()).await,
        Command::Reset { stream, yes } => cmd_reset(config_path.as_deref(), &stream, yes).await,
        Command::History => cmd_history(config_path.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Today's date in the configured publication offset.
fn publication_today(config: &AppConfig) -> Result<NaiveDate> {
    let offset = FixedOffset::east_opt(config.publish.utc_offset_hours * 3600)
        .ok_or_else(|| eyre!("invalid utc_offset_hours {}", config.publish.utc_offset_hours))?;
    Ok(Utc::now().with_timezone(&offset).date_naive())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, date: Option<NaiveDate>, dry_run: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    validate_api_key(&config)?;

    let date = match date {
        Some(d) => d,
        None => publication_today(&config)?,
    };

    info!(%date, dry_run, streams = config.streams.len(), "starting daily cycle");

    let fetcher = Arc::new(HttpFetcher::new(config.fetch.clone())?);
    let synthesizer = Arc::new(AnthropicSynthesizer::new(config.synthesis.clone())?);
    let deployer: Option<Arc<dyn Deployer>> = if config.deploy.project_name.is_empty() {
        info!("no deploy project configured, publishing locally only");
        None
    } else {
        Some(Arc::new(WranglerDeployer::new(&config.deploy)))
    };

    let reporter = CliProgress::new();
    let opts = CycleOptions { date, dry_run };
    let summary = run_cycle(&config, &opts, fetcher, synthesizer, deployer, &reporter).await?;
    reporter.finish();

    println!();
    println!("  Cycle {} for {}", summary.run_id, summary.date);
    for (id, outcome) in &summary.outcomes {
        println!("  {id:<16} {outcome}");
    }
    println!(
        "  {}",
        if summary.published {
            if dry_run {
                "Published (dry run, deploy skipped)"
            } else {
                "Published"
            }
        } else {
            "Nothing to publish"
        }
    );
    println!("  Time: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Cycle progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CycleProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn stream_done(&self, stream_id: &str, outcome: &OutcomeKind) {
        self.spinner
            .set_message(format!("{stream_id}: {outcome}"));
    }
}

// ---------------------------------------------------------------------------
// build / reset / history
// ---------------------------------------------------------------------------

async fn cmd_build(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let days = daybrief_core::rebuild_site(&config.paths, &config.streams)?;
    println!(
        "Rebuilt site at {} ({days} day{})",
        config.paths.site().display(),
        if days == 1 { "" } else { "s" }
    );
    Ok(())
}

async fn cmd_reset(config_path: Option<&Path>, stream_id: &str, yes: bool) -> Result<()> {
    let config = resolve_config(config_path)?;

    let stream = config
        .streams
        .iter()
        .find(|s| s.id == stream_id)
        .ok_or_else(|| eyre!("unknown stream '{stream_id}'"))?;

    if !yes {
        return Err(eyre!(
            "resetting '{stream_id}' makes every past item look new again; \
             re-run with --yes to confirm"
        ));
    }

    let store = open_store(stream.backend, &config.paths.novelty_dir(), &stream.id).await?;
    store.reset().await?;

    info!(stream = %stream.id, "novelty store reset");
    println!("Novelty store for '{stream_id}' cleared.");
    Ok(())
}

async fn cmd_history(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let history = load_history(&config.paths.archive_dir())?;

    if history.is_empty() {
        println!("No published days yet.");
        return Ok(());
    }

    for record in &history {
        let titles: Vec<&str> = record.sections.iter().map(|s| s.title.as_str()).collect();
        println!("{}  {}", record.date, titles.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
