//! Application configuration for Prepnest.
//!
//! User config lives at `~/.prepnest/prepnest.toml`. Environment variables
//! override config file values, which override defaults. The CLI applies its
//! flags on top of the resolved [`WorkerConfig`] before validating it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PrepnestError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "prepnest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".prepnest";

/// Environment variable overriding the Sanity project ID.
pub const ENV_PROJECT_ID: &str = "SANITY_PROJECT_ID";
/// Environment variable overriding the Sanity dataset.
pub const ENV_DATASET: &str = "SANITY_DATASET";
/// Environment variable overriding the batch size.
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
/// Environment variable overriding the inter-lesson delay.
pub const ENV_DELAY_MS: &str = "DELAY_MS";
/// Environment variable enabling dry-run mode.
pub const ENV_DRY_RUN: &str = "DRY_RUN";

// ---------------------------------------------------------------------------
// Config structs (matching prepnest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sanity content store settings.
    #[serde(default)]
    pub sanity: SanityConfig,

    /// Anthropic generation service settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Batch sizing and pacing.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// `[sanity]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanityConfig {
    #[serde(default = "default_project_id")]
    pub project_id: String,

    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Dated HTTP API version.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Name of the env var holding the write token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Override for the API host, e.g. a local proxy. Defaults to
    /// `https://<project_id>.api.sanity.io`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            dataset: default_dataset(),
            api_version: default_api_version(),
            token_env: default_token_env(),
            api_host: None,
        }
    }
}

fn default_project_id() -> String {
    "4oo7x5cb".into()
}
fn default_dataset() -> String {
    "production".into()
}
fn default_api_version() -> String {
    "2024-01-01".into()
}
fn default_token_env() -> String {
    "SANITY_API_TOKEN".into()
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for both generation stages.
    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Lessons fetched per run.
    #[serde(default = "default_batch_size")]
    pub size: usize,

    /// Pause between lessons, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}
fn default_delay_ms() -> u64 {
    1000
}

// ---------------------------------------------------------------------------
// Worker config (runtime, merged from config file + environment + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one rewrite run.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub api_host: Option<String>,
    /// Sanity write token.
    pub store_token: Option<String>,
    /// Anthropic API key.
    pub generator_api_key: Option<String>,
    pub generator_base_url: Option<String>,
    pub model: String,
    pub batch_size: usize,
    pub delay_ms: u64,
    /// Suppress all store mutations.
    pub dry_run: bool,
    /// Name of the token env var, kept for error messages.
    pub token_env: String,
    /// Name of the API key env var, kept for error messages.
    pub api_key_env: String,
}

impl WorkerConfig {
    /// Resolve against the process environment.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve the file config against an environment lookup.
    ///
    /// Empty variables are treated as unset.
    pub fn resolve(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut worker = Self::from(config);

        if let Some(raw) = var(ENV_BATCH_SIZE) {
            worker.batch_size = parse_number(ENV_BATCH_SIZE, &raw)?;
        }
        if let Some(raw) = var(ENV_DELAY_MS) {
            worker.delay_ms = parse_number(ENV_DELAY_MS, &raw)?;
        }
        if let Some(project_id) = var(ENV_PROJECT_ID) {
            worker.project_id = project_id;
        }
        if let Some(dataset) = var(ENV_DATASET) {
            worker.dataset = dataset;
        }
        worker.store_token = var(&config.sanity.token_env);
        worker.generator_api_key = var(&config.anthropic.api_key_env);
        worker.dry_run = var(ENV_DRY_RUN).is_some_and(|v| parse_flag(&v));

        Ok(worker)
    }

    /// Check the resolved config before any processing starts.
    ///
    /// Credentials are only required outside dry-run mode.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PrepnestError::config("batch size must be a positive integer"));
        }
        if self.project_id.trim().is_empty() || self.dataset.trim().is_empty() {
            return Err(PrepnestError::config("Sanity project ID and dataset must be set"));
        }
        if self.dry_run {
            return Ok(());
        }
        if self.store_token.is_none() {
            return Err(PrepnestError::config(format!(
                "{} is required for non-dry-run mode",
                self.token_env
            )));
        }
        if self.generator_api_key.is_none() {
            return Err(PrepnestError::config(format!(
                "{} is required for non-dry-run mode",
                self.api_key_env
            )));
        }
        Ok(())
    }

    /// Inter-lesson delay.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl From<&AppConfig> for WorkerConfig {
    /// File values only; secrets come from the environment.
    fn from(config: &AppConfig) -> Self {
        Self {
            project_id: config.sanity.project_id.clone(),
            dataset: config.sanity.dataset.clone(),
            api_version: config.sanity.api_version.clone(),
            api_host: config.sanity.api_host.clone(),
            store_token: None,
            generator_api_key: None,
            generator_base_url: config.anthropic.base_url.clone(),
            model: config.anthropic.model.clone(),
            batch_size: config.batch.size,
            delay_ms: config.batch.delay_ms,
            dry_run: false,
            token_env: config.sanity.token_env.clone(),
            api_key_env: config.anthropic.api_key_env.clone(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| PrepnestError::config(format!("{name} must be a non-negative integer, got '{raw}'")))
}

fn parse_flag(raw: &str) -> bool {
    let v = raw.trim();
    v.eq_ignore_ascii_case("true") || v == "1"
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.prepnest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PrepnestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.prepnest/prepnest.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PrepnestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PrepnestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PrepnestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PrepnestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PrepnestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
