//! The explicit execution context threaded through every pipeline stage.

use std::path::{Component, Path, PathBuf};

/// Per-invocation context: the workspace root and the running tool version.
///
/// Relative paths found in the graph are resolved against `root`, and hashes
/// use paths relative to it, so moving a checkout leaves hashes unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    root: PathBuf,
    tool_version: String,
}

impl ExecutionContext {
    /// Creates a context rooted at `root`, tagged with this crate's version.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Overrides the tool version recorded in cache entries.
    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    /// Returns the workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the tool version.
    pub fn tool_version(&self) -> &str {
        &self.tool_version
    }

    /// Resolves a graph path to a filesystem path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Returns `path` relative to the root with `/` separators.
    ///
    /// Paths outside the root are returned normalized but otherwise unchanged.
    pub fn relativize(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                Component::RootDir => Some(String::new()),
                Component::CurDir | Component::Prefix(_) => None,
            })
            .collect();
        parts.join("/")
    }
}
