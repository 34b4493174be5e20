//! Configuration types deserialized from `skein.toml`.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The top-level configuration parsed from `skein.toml`.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkeinConfig {
    /// Cache store settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Import scanner settings.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Lint settings (deny/allow rules).
    #[serde(default)]
    pub lint: LintConfig,
    /// Selective testing settings.
    #[serde(default)]
    pub selective: SelectiveConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Local and remote cache configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Local cache directory, relative to the workspace root unless absolute.
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
    /// Optional remote cache backend.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    /// Retry policy for remote round trips.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            remote: None,
            retry: RetryConfig::default(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".skein/cache")
}

/// A remote HTTP cache backend.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL of the cache service.
    pub url: String,
    /// Project handle sent with every request.
    #[serde(default)]
    pub project: Option<String>,
    /// Name of the environment variable holding the bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Maximum number of keys per round trip.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteConfig {
    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Bounded exponential backoff for remote cache calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per batch, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Factor applied to the delay after each failed attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    2.0
}

/// Import scanner settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Worker threads for scanning; `0` uses the global rayon pool.
    #[serde(default)]
    pub threads: usize,
}

/// Lint configuration for promoting or suppressing rules.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintConfig {
    /// Rule names to treat as errors.
    #[serde(default)]
    pub deny: Vec<String>,
    /// Rule names to suppress.
    #[serde(default)]
    pub allow: Vec<String>,
}

/// Selective testing configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectiveConfig {
    /// Extra strings folded into every target hash.
    #[serde(default)]
    pub additional_strings: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Minimum level: trace, debug, info, warn, or error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}
