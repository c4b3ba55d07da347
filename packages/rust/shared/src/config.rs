//! Application configuration for promptkit.
//!
//! User config lives at `~/.promptkit/promptkit.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored here, only the names of the env vars holding them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PromptKitError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "promptkit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".promptkit";

// ---------------------------------------------------------------------------
// Config structs (matching promptkit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Concurrent search fan-out limits.
    #[serde(default)]
    pub fanout: FanoutSettings,

    /// External API endpoints and models.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Instagram lead collection.
    #[serde(default)]
    pub leads: LeadsConfig,

    /// Ads library link collection.
    #[serde(default)]
    pub ads: AdsConfig,

    /// File change tracker.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// CSV row generation.
    #[serde(default)]
    pub datagen: DatagenConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory every relative output path is resolved against.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory numbered research reports are written to.
    #[serde(default = "default_research_dir")]
    pub research_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            research_dir: default_research_dir(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_research_dir() -> String {
    "research_results".into()
}

/// `[fanout]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutSettings {
    /// Maximum requests in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl FanoutSettings {
    /// Per-request timeout, at least one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_concurrency() -> u32 {
    4
}
fn default_timeout_secs() -> u64 {
    60
}

/// One external HTTP API.
///
/// A `[providers.<name>]` table replaces the built-in defaults wholesale, so
/// `api_key_env`, `base_url` and `default_model` must all be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    /// Base URL requests are joined onto.
    pub base_url: String,
    /// Model used when the caller does not pick one.
    pub default_model: String,
    /// Lighter model used by "fast" modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_model: Option<String>,
}

impl ProviderConfig {
    fn new(api_key_env: &str, base_url: &str, default_model: &str) -> Self {
        Self {
            api_key_env: api_key_env.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
            fast_model: None,
        }
    }

    /// The fast model if configured, otherwise the default one.
    pub fn fast_or_default(&self) -> &str {
        self.fast_model.as_deref().unwrap_or(&self.default_model)
    }
}

/// `[providers]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,
    #[serde(default = "default_perplexity")]
    pub perplexity: ProviderConfig,
    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderConfig,
    #[serde(default = "default_xai")]
    pub xai: ProviderConfig,
    #[serde(default = "default_tavily")]
    pub tavily: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            perplexity: default_perplexity(),
            anthropic: default_anthropic(),
            xai: default_xai(),
            tavily: default_tavily(),
        }
    }
}

fn default_openai() -> ProviderConfig {
    ProviderConfig::new("OPENAI_API_KEY", "https://api.openai.com/v1", "gpt-4o")
}
fn default_perplexity() -> ProviderConfig {
    ProviderConfig {
        fast_model: Some("llama-3.1-sonar-small-128k-online".into()),
        ..ProviderConfig::new(
            "PERPLEXITY_API_KEY",
            "https://api.perplexity.ai",
            "llama-3.1-sonar-large-128k-online",
        )
    }
}
fn default_anthropic() -> ProviderConfig {
    ProviderConfig::new(
        "ANTHROPIC_API_KEY",
        "https://api.anthropic.com",
        "claude-3-5-sonnet-20241022",
    )
}
fn default_xai() -> ProviderConfig {
    ProviderConfig::new("XAI_API_KEY", "https://api.x.ai/v1", "grok-beta")
}
fn default_tavily() -> ProviderConfig {
    ProviderConfig::new("TAVILY_API_KEY", "https://api.tavily.com", "advanced")
}

/// `[leads]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadsConfig {
    /// JSON file accumulating every lead found so far.
    #[serde(default = "default_leads_file")]
    pub output_file: String,

    /// Upper bound on search rounds per run.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Results requested from the search API per round.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Domains the search is restricted to.
    #[serde(default = "default_lead_domains")]
    pub include_domains: Vec<String>,
}

impl Default for LeadsConfig {
    fn default() -> Self {
        Self {
            output_file: default_leads_file(),
            max_rounds: default_max_rounds(),
            max_results: default_max_results(),
            include_domains: default_lead_domains(),
        }
    }
}

fn default_leads_file() -> String {
    "instagram_leads.json".into()
}
fn default_max_rounds() -> u32 {
    10
}
fn default_max_results() -> u32 {
    50
}
fn default_lead_domains() -> Vec<String> {
    vec![
        "instagram.com".into(),
        "facebook.com".into(),
        "linkedin.com".into(),
    ]
}

/// `[ads]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsConfig {
    /// Ads library search page.
    #[serde(default = "default_library_url")]
    pub library_url: String,

    /// Two-letter country filter.
    #[serde(default = "default_country")]
    pub country: String,

    /// Directory link files are written to.
    #[serde(default = "default_ads_results_dir")]
    pub results_dir: String,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            library_url: default_library_url(),
            country: default_country(),
            results_dir: default_ads_results_dir(),
        }
    }
}

fn default_library_url() -> String {
    "https://www.facebook.com/ads/library/".into()
}
fn default_country() -> String {
    "US".into()
}
fn default_ads_results_dir() -> String {
    "results".into()
}

/// `[tracker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// File extensions (without the dot) that are snapshotted.
    #[serde(default = "default_tracked_extensions")]
    pub tracked_extensions: Vec<String>,

    /// Where the previous snapshot is kept.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,

    /// Markdown log that change summaries are appended to.
    #[serde(default = "default_progress_file")]
    pub progress_file: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracked_extensions: default_tracked_extensions(),
            snapshot_file: default_snapshot_file(),
            progress_file: default_progress_file(),
        }
    }
}

fn default_tracked_extensions() -> Vec<String> {
    vec!["rs".into(), "toml".into(), "txt".into(), "md".into()]
}
fn default_snapshot_file() -> String {
    "last_state.json".into()
}
fn default_progress_file() -> String {
    "PROGRESS.md".into()
}

/// `[datagen]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatagenConfig {
    /// Anthropic model used for analysis and generation.
    #[serde(default = "default_datagen_model")]
    pub model: String,

    /// Copy of the grown CSV written after generation.
    #[serde(default = "default_datagen_output")]
    pub output_file: String,
}

impl Default for DatagenConfig {
    fn default() -> Self {
        Self {
            model: default_datagen_model(),
            output_file: default_datagen_output(),
        }
    }
}

fn default_datagen_model() -> String {
    "claude-3-sonnet-20240229".into()
}
fn default_datagen_output() -> String {
    "output.csv".into()
}

// ---------------------------------------------------------------------------
// Fan-out config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fan-out limits.
#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    /// Maximum requests in flight at once (at least 1).
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl From<&AppConfig> for FanoutConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.fanout.concurrency.max(1) as usize,
            timeout: config.fanout.timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.promptkit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PromptKitError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.promptkit/promptkit.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PromptKitError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PromptKitError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PromptKitError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PromptKitError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PromptKitError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key for `provider` from its env var.
///
/// A missing or empty variable is fatal and names the variable to set.
pub fn resolve_api_key(provider: &str, config: &ProviderConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(PromptKitError::config(format!(
            "{provider} API key not found. Set the {var_name} environment variable."
        ))),
    }
}
