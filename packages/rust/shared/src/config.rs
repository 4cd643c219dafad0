//! Application configuration for Daybrief.
//!
//! User config lives at `~/.daybrief/daybrief.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DaybriefError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "daybrief.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".daybrief";

// ---------------------------------------------------------------------------
// Config structs (matching daybrief.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Filesystem locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Publication settings.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Anthropic synthesis settings.
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Feed fetching settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Cycle-level timeouts and the run lock.
    #[serde(default)]
    pub cycle: CycleConfig,

    /// Cloudflare Pages deploy settings.
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Configured streams, in publication order.
    #[serde(default = "default_streams")]
    pub streams: Vec<StreamConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            publish: PublishConfig::default(),
            synthesis: SynthesisConfig::default(),
            fetch: FetchConfig::default(),
            cycle: CycleConfig::default(),
            deploy: DeployConfig::default(),
            streams: default_streams(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root for archive, novelty stores, and the run lock.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Output directory for the rendered static site.
    #[serde(default = "default_site_dir")]
    pub site_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            site_dir: default_site_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.daybrief/data".into()
}
fn default_site_dir() -> String {
    "~/.daybrief/site".into()
}

impl PathsConfig {
    /// Archive directory holding one JSON record per published day.
    pub fn archive_dir(&self) -> PathBuf {
        expand_home(&self.data_dir).join("archive")
    }

    /// Directory holding per-stream novelty stores.
    pub fn novelty_dir(&self) -> PathBuf {
        expand_home(&self.data_dir).join("novelty")
    }

    /// Lease file guarding against overlapping cycles.
    pub fn lock_path(&self) -> PathBuf {
        expand_home(&self.data_dir).join("run.lock")
    }

    /// Rendered site output directory.
    pub fn site(&self) -> PathBuf {
        expand_home(&self.site_dir)
    }
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Fixed UTC offset (hours) defining the publication day boundary.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset(),
        }
    }
}

fn default_utc_offset() -> i32 {
    -5
}

/// `[synthesis]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Claude model ID.
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens for the synthesis response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Batches above this size are synthesized in chunks.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_synthesis_timeout")]
    pub request_timeout_secs: u64,

    /// API base URL override (for tests/mocking).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            chunk_size: default_chunk_size(),
            request_timeout_secs: default_synthesis_timeout(),
            base_url: None,
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-5".into()
}
fn default_max_tokens() -> u32 {
    8000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_chunk_size() -> usize {
    30
}
fn default_synthesis_timeout() -> u64 {
    120
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Only items newer than this window are considered.
    #[serde(default = "default_lookback")]
    pub lookback_hours: u32,

    /// Minimum ms between successive source requests.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub request_timeout_secs: u64,

    /// How many top Hacker News stories to keep per cycle.
    #[serde(default = "default_hn_top_count")]
    pub hn_top_count: usize,

    /// Hacker News stories older than this are dropped.
    #[serde(default = "default_hn_freshness")]
    pub hn_freshness_hours: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback(),
            rate_limit_ms: default_rate_limit(),
            request_timeout_secs: default_fetch_timeout(),
            hn_top_count: default_hn_top_count(),
            hn_freshness_hours: default_hn_freshness(),
        }
    }
}

fn default_lookback() -> u32 {
    24
}
fn default_rate_limit() -> u64 {
    1000
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_hn_top_count() -> usize {
    15
}
fn default_hn_freshness() -> u32 {
    18
}

/// `[cycle]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Whole-stream fetch budget in seconds.
    #[serde(default = "default_stream_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Whole-stream synthesis budget in seconds.
    #[serde(default = "default_stream_synthesis_timeout")]
    pub synthesis_timeout_secs: u64,

    /// A run lock older than this is considered stale and broken.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_stream_fetch_timeout(),
            synthesis_timeout_secs: default_stream_synthesis_timeout(),
            lock_ttl_secs: default_lock_ttl(),
        }
    }
}

fn default_stream_fetch_timeout() -> u64 {
    180
}
fn default_stream_synthesis_timeout() -> u64 {
    300
}
fn default_lock_ttl() -> u64 {
    3600
}

/// `[deploy]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Cloudflare Pages project name.
    #[serde(default)]
    pub project_name: String,

    /// Cloudflare account ID, passed through the wrangler environment.
    #[serde(default)]
    pub account_id: String,

    /// Deploy subprocess timeout in seconds.
    #[serde(default = "default_deploy_timeout")]
    pub timeout_secs: u64,
}

fn default_deploy_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// Novelty store backend selection, per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Flat persisted JSON set with atomic replace.
    Json,
    /// Embedded libSQL database.
    Sqlite,
}

/// Kind of content source within a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS/Atom feed.
    Rss,
    /// Hacker News front page (Algolia API).
    Hn,
}

/// One content source within a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source kind.
    pub kind: SourceKind,
    /// Display name (e.g., "Simon Willison's Blog").
    pub name: String,
    /// Feed URL; required for `rss`, unused for `hn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `[[streams]]` entry — one independently-failing content pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stable stream identifier (e.g., `pure-signal`).
    pub id: String,
    /// Display title for published sections.
    pub title: String,
    /// Novelty store backend.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Persona system prompt override for synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Content sources, polled in order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Json
}

/// The two shipped streams: frontier-AI research and Ferrari F1 news.
fn default_streams() -> Vec<StreamConfig> {
    vec![
        StreamConfig {
            id: "pure-signal".into(),
            title: "Pure Signal".into(),
            backend: StoreBackend::Json,
            persona: None,
            sources: vec![
                SourceConfig {
                    kind: SourceKind::Rss,
                    name: "Simon Willison's Blog".into(),
                    url: Some("https://simonwillison.net/atom/everything/".into()),
                },
                SourceConfig {
                    kind: SourceKind::Rss,
                    name: "Interconnects".into(),
                    url: Some("https://www.interconnects.ai/feed".into()),
                },
                SourceConfig {
                    kind: SourceKind::Hn,
                    name: "Hacker News".into(),
                    url: None,
                },
            ],
        },
        StreamConfig {
            id: "maranello".into(),
            title: "Maranello Signal".into(),
            backend: StoreBackend::Sqlite,
            persona: None,
            sources: vec![
                SourceConfig {
                    kind: SourceKind::Rss,
                    name: "Formu1a.uno".into(),
                    url: Some("https://www.formu1a.uno/feed/".into()),
                },
                SourceConfig {
                    kind: SourceKind::Rss,
                    name: "Ferrari Media".into(),
                    url: Some("https://media.ferrari.com/feed/".into()),
                },
                SourceConfig {
                    kind: SourceKind::Rss,
                    name: "Motorsport.com IT".into(),
                    url: Some("https://it.motorsport.com/rss/f1/news/".into()),
                },
            ],
        },
    ]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Get the path to the config directory (`~/.daybrief/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DaybriefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.daybrief/daybrief.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DaybriefError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| DaybriefError::config(format!("failed to parse {}: {e}", path.display())))?;

    validate_streams(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DaybriefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DaybriefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DaybriefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that stream IDs are unique and every RSS source carries a URL.
fn validate_streams(config: &AppConfig) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for stream in &config.streams {
        if !seen.insert(stream.id.as_str()) {
            return Err(DaybriefError::validation(format!(
                "duplicate stream id '{}'",
                stream.id
            )));
        }
        for source in &stream.sources {
            if source.kind == SourceKind::Rss {
                let raw = source.url.as_deref().ok_or_else(|| {
                    DaybriefError::validation(format!(
                        "rss source '{}' in stream '{}' has no url",
                        source.name, stream.id
                    ))
                })?;
                url::Url::parse(raw).map_err(|e| {
                    DaybriefError::validation(format!(
                        "rss source '{}' in stream '{}' has an invalid url: {e}",
                        source.name, stream.id
                    ))
                })?;
            }
        }
    }
    Ok(())
}

/// Check that the Anthropic API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.synthesis.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(DaybriefError::config(format!(
            "Anthropic API key not found. Set the {var_name} environment variable."
        ))),
    }
}
