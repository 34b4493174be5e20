//! Parsing and validation of `skein.toml` configuration files.
//!
//! This crate reads the workspace configuration and produces a strongly-typed
//! [`SkeinConfig`] covering the cache backends, retry policy, scanner pool,
//! lint overrides, selective-testing inputs, and logging.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
