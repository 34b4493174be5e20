//! Structured logging setup.
//!
//! Installs a `tracing` subscriber once per process, configured from the
//! `[log]` section of `skein.toml`. When `RUST_LOG` is set it replaces the
//! configured level entirely.

use std::sync::Once;

use skein_config::{LogConfig, LogFormat};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Parses a level name, case-insensitively. Unknown names mean `INFO`.
pub fn parse_level(level: &str) -> Level {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter directives used when `RUST_LOG` is unset.
///
/// HTTP client internals stay at `warn` unless asked for explicitly.
pub fn default_directives(config: &LogConfig) -> String {
    let level = parse_level(&config.level);
    format!("{},ureq=warn,ureq_proto=warn,rustls=warn", level.as_str().to_ascii_lowercase())
}

fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(config)))
}

/// Installs the global subscriber. Later calls do nothing.
///
/// If another subscriber is already installed (an embedding application,
/// a test harness) it is left in place.
pub fn init_logging(config: &LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(filter(config));
        let _ = match config.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_names(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init(),
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn unknown_level_is_info() {
        assert_eq!(parse_level("loud"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn directives_quiet_http_client() {
        let config = LogConfig {
            level: "debug".into(),
            format: LogFormat::Json,
        };
        let directives = default_directives(&config);
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("ureq=warn"));
        let _ = EnvFilter::new(directives);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(&LogConfig::default());
        init_logging(&LogConfig::default());
    }
}
