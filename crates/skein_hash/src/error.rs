//! Error types for target hashing.

use std::path::PathBuf;

use skein_common::InternalError;
use skein_graph::{GraphError, TargetRef};

/// Errors that can occur while hashing targets.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// A declared source or header could not be read.
    #[error("cannot read '{}' of target '{target}': {source}", path.display())]
    Unreadable {
        /// The target being hashed.
        target: TargetRef,
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The graph is malformed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A defect in the hasher itself.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
