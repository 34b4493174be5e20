//! Errors that abort a run.

use skein_cache::CacheError;
use skein_config::ConfigError;
use skein_graph::GraphError;
use skein_hash::HashError;
use skein_scan::ScanError;

/// A failure that stops [`Engine::run`](crate::Engine::run) before the
/// executor is called, or keeps an engine from being built.
///
/// Cache trouble during a run is not in here: fetch failures become misses
/// and store failures become report warnings. [`EngineError::Cache`] only
/// comes from opening the store.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `skein.toml` could not be read or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The graph is malformed or the request names something it lacks.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A target could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// The cache store could not be opened.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The scanner pool could not be built.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The same target is both included and excluded.
    #[error("targets are both included and excluded: {}", names.join(", "))]
    ConflictingFilters {
        /// Offending target names, sorted.
        names: Vec<String>,
    },

    /// A filter names a target the scheme does not test.
    #[error("scheme '{scheme}' does not test: {}", names.join(", "))]
    UnknownFilterTarget {
        /// The requested scheme.
        scheme: String,
        /// Unknown target names, sorted.
        names: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_errors_list_names() {
        let err = EngineError::ConflictingFilters {
            names: vec!["AppTests".into(), "CoreTests".into()],
        };
        assert_eq!(
            err.to_string(),
            "targets are both included and excluded: AppTests, CoreTests"
        );

        let err = EngineError::UnknownFilterTarget {
            scheme: "App".into(),
            names: vec!["Nope".into()],
        };
        assert_eq!(err.to_string(), "scheme 'App' does not test: Nope");
    }

    #[test]
    fn graph_errors_pass_through() {
        let err: EngineError = GraphError::SchemeNotFound("Missing".into()).into();
        assert_eq!(err.to_string(), GraphError::SchemeNotFound("Missing".into()).to_string());
    }
}
