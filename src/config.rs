//! Configuration loading and validation.
//!
//! Configuration is read once at startup from `config.toml`. Every field has
//! a default, and a missing file yields the default three-provider chain:
//! primary API, direct send, local simulation.
//!
//! Path precedence: `--config` flag > `$HERALD_CONFIG` > `~/.herald/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::{direct, simulated, system_api};
use crate::retry::{BackoffStrategy, RetryPolicy};

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "HERALD_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Bounded executor settings.
    pub executor: ExecutorConfig,
    /// Per-provider retry policy used by the provider chain.
    pub retry: RetryConfig,
    /// Retry policy of the HTTP-level invoker (health checks).
    pub http_retry: RetryConfig,
    /// Batching settings.
    pub batch: BatchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Delivery providers.
    pub providers: Vec<ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            retry: RetryConfig::default(),
            http_retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            logging: LoggingConfig::default(),
            providers: default_providers(),
        }
    }
}

impl Config {
    /// Parse a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("failed to parse config TOML: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.batch.size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.retry.max_attempts == 0 || self.http_retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let mut names = std::collections::HashSet::new();
        for provider in &self.providers {
            if !names.insert(provider.name()) {
                return Err(ConfigError::DuplicateProvider(provider.name().to_owned()));
            }
            if let Some(base_url) = provider.base_url() {
                url::Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl {
                    provider: provider.name().to_owned(),
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// Retry policy for the provider chain (exponential unless configured).
    pub fn chain_policy(&self) -> RetryPolicy {
        self.retry.policy(BackoffStrategy::Exponential)
    }

    /// Retry policy for the HTTP invoker (linear unless configured).
    pub fn http_policy(&self) -> RetryPolicy {
        self.http_retry.policy(BackoffStrategy::Linear)
    }
}

/// Semantic configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `executor.timeout_ms` is zero.
    #[error("executor.timeout_ms must be greater than zero")]
    ZeroTimeout,
    /// `batch.size` is zero.
    #[error("batch.size must be greater than zero")]
    ZeroBatchSize,
    /// A retry budget is zero.
    #[error("max_attempts must be greater than zero")]
    ZeroAttempts,
    /// `providers` is empty.
    #[error("at least one provider must be configured")]
    NoProviders,
    /// Two providers share a name.
    #[error("duplicate provider name '{0}'")]
    DuplicateProvider(String),
    /// A provider base URL does not parse.
    #[error("provider '{provider}' has an invalid base_url: {reason}")]
    InvalidUrl {
        /// Offending provider.
        provider: String,
        /// Parser message.
        reason: String,
    },
}

// ── Sections ────────────────────────────────────────────────────

/// Bounded executor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Hard wall-clock bound per outbound call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ExecutorConfig {
    /// Timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Attempt budget and backoff.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Backoff seed in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on a single backoff sleep in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff law; each layer has its own default when unset.
    pub strategy: Option<BackoffStrategy>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            strategy: None,
        }
    }
}

impl RetryConfig {
    /// Build a policy, using `fallback` when no strategy is configured.
    pub fn policy(&self, fallback: BackoffStrategy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            strategy: self.strategy.unwrap_or(fallback),
        }
    }
}

/// Batching settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum addresses per batch.
    pub size: usize,
    /// Pause between batches in milliseconds.
    pub pacing_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl BatchConfig {
    /// Pacing as a [`Duration`].
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs; console only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            directory: None,
        }
    }
}

/// One delivery provider, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Primary notification API.
    SystemApi {
        /// Registry name.
        #[serde(default = "default_system_api_name")]
        name: String,
        /// Chain priority.
        #[serde(default = "default_system_api_priority")]
        priority: u32,
        /// API root URL.
        #[serde(default = "default_api_base_url")]
        base_url: String,
        /// Environment variable holding the bearer token.
        #[serde(default = "default_token_env")]
        token_env: String,
        /// Sender identity recorded by the API.
        #[serde(default = "default_sender_id")]
        sender_id: String,
    },
    /// Direct-send endpoint.
    DirectSend {
        /// Registry name.
        #[serde(default = "default_direct_name")]
        name: String,
        /// Chain priority.
        #[serde(default = "default_direct_priority")]
        priority: u32,
        /// Endpoint root URL.
        #[serde(default = "default_api_base_url")]
        base_url: String,
        /// Environment variable holding an optional bearer token.
        #[serde(default)]
        token_env: Option<String>,
    },
    /// Local simulation fallback.
    Simulated {
        /// Registry name.
        #[serde(default = "default_simulated_name")]
        name: String,
        /// Chain priority.
        #[serde(default = "default_simulated_priority")]
        priority: u32,
        /// Simulated processing time in milliseconds.
        #[serde(default = "default_latency_ms")]
        latency_ms: u64,
    },
}

impl ProviderConfig {
    /// Registry name.
    pub fn name(&self) -> &str {
        match self {
            Self::SystemApi { name, .. }
            | Self::DirectSend { name, .. }
            | Self::Simulated { name, .. } => name,
        }
    }

    /// Chain priority.
    pub fn priority(&self) -> u32 {
        match self {
            Self::SystemApi { priority, .. }
            | Self::DirectSend { priority, .. }
            | Self::Simulated { priority, .. } => *priority,
        }
    }

    /// Base URL for HTTP-backed providers.
    pub fn base_url(&self) -> Option<&str> {
        match self {
            Self::SystemApi { base_url, .. } | Self::DirectSend { base_url, .. } => Some(base_url),
            Self::Simulated { .. } => None,
        }
    }
}

/// The default chain: primary API (1), direct send (2), local simulation (3).
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::SystemApi {
            name: default_system_api_name(),
            priority: default_system_api_priority(),
            base_url: default_api_base_url(),
            token_env: default_token_env(),
            sender_id: default_sender_id(),
        },
        ProviderConfig::DirectSend {
            name: default_direct_name(),
            priority: default_direct_priority(),
            base_url: default_api_base_url(),
            token_env: None,
        },
        ProviderConfig::Simulated {
            name: default_simulated_name(),
            priority: default_simulated_priority(),
            latency_ms: default_latency_ms(),
        },
    ]
}

// Default value functions for serde

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_batch_size() -> usize {
    5
}
fn default_pacing_ms() -> u64 {
    500
}
fn default_system_api_name() -> String {
    system_api::DEFAULT_NAME.to_owned()
}
fn default_system_api_priority() -> u32 {
    1
}
fn default_direct_name() -> String {
    direct::DEFAULT_NAME.to_owned()
}
fn default_direct_priority() -> u32 {
    2
}
fn default_simulated_name() -> String {
    simulated::DEFAULT_NAME.to_owned()
}
fn default_simulated_priority() -> u32 {
    3
}
fn default_api_base_url() -> String {
    "http://localhost:3001/api".to_owned()
}
fn default_token_env() -> String {
    "HERALD_API_TOKEN".to_owned()
}
fn default_sender_id() -> String {
    "1".to_owned()
}
fn default_latency_ms() -> u64 {
    u64::try_from(simulated::DEFAULT_LATENCY.as_millis()).unwrap_or(500)
}

// ── Loading ─────────────────────────────────────────────────────

/// Load and validate the config at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    Config::from_toml(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))
}

/// Load the config at `path`, falling back to defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed or validated.
pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file found, using defaults");
        return Ok(Config::default());
    }
    tracing::info!(path = %path.display(), "loading config from file");
    load_config(path)
}

/// Resolve the default config directory (`~/.herald/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".herald"))
}

/// Resolve the config file path from an explicit flag, the environment, or
/// the default directory, in that order.
///
/// # Errors
///
/// Returns an error if the default directory is needed and cannot be resolved.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.toml"))
}
