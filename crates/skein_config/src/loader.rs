//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SkeinConfig;
use std::path::Path;

/// File name of the workspace configuration.
pub const CONFIG_FILE: &str = "skein.toml";

/// Loads and validates `skein.toml` from a workspace directory.
///
/// A missing file is not an error: the defaults are returned.
pub fn load_config(workspace_dir: &Path) -> Result<SkeinConfig, ConfigError> {
    let config_path = workspace_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(SkeinConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `skein.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<SkeinConfig, ConfigError> {
    let config: SkeinConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Validates value ranges that serde cannot express.
fn validate_config(config: &SkeinConfig) -> Result<(), ConfigError> {
    if let Some(remote) = &config.cache.remote {
        if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
            return Err(invalid("cache.remote.url", "must be an http(s) URL"));
        }
        if remote.batch_size == 0 {
            return Err(invalid("cache.remote.batch_size", "must be greater than zero"));
        }
        if remote.timeout_ms == 0 {
            return Err(invalid("cache.remote.timeout_ms", "must be greater than zero"));
        }
    }
    let retry = &config.cache.retry;
    if retry.max_attempts == 0 {
        return Err(invalid("cache.retry.max_attempts", "must be at least 1"));
    }
    if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
        return Err(invalid("cache.retry.multiplier", "must be at least 1.0"));
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(invalid(
            "cache.retry.initial_backoff_ms",
            "must not exceed max_backoff_ms",
        ));
    }
    if !matches!(
        config.log.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "log.level",
            "expected one of trace, debug, info, warn, error",
        ));
    }
    Ok(())
}
