//! Boundary to whatever actually builds and runs tests.

use serde::{Deserialize, Serialize};
use skein_common::ContentHash;
use skein_graph::TargetRef;

/// A target handed to the executor, with the hash it was selected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTarget {
    /// The test target.
    pub target: TargetRef,
    /// Its content hash for this run.
    pub hash: ContentHash,
}

/// How an executor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOutcome {
    /// Every target built and passed.
    Succeeded,
    /// Something failed or the run was aborted.
    Failed,
}

impl ExecutionOutcome {
    /// Returns `true` for [`ExecutionOutcome::Succeeded`].
    pub fn is_success(self) -> bool {
        self == ExecutionOutcome::Succeeded
    }
}

/// Runs a set of test targets.
///
/// Only a [`ExecutionOutcome::Succeeded`] result lets the executed targets
/// be recorded in the cache.
pub trait TestExecutor {
    /// Builds and runs `targets`.
    fn run(&self, targets: &[ExecutionTarget]) -> ExecutionOutcome;
}

impl<F> TestExecutor for F
where
    F: Fn(&[ExecutionTarget]) -> ExecutionOutcome,
{
    fn run(&self, targets: &[ExecutionTarget]) -> ExecutionOutcome {
        self(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_executors() {
        let executor = |targets: &[ExecutionTarget]| {
            if targets.is_empty() {
                ExecutionOutcome::Failed
            } else {
                ExecutionOutcome::Succeeded
            }
        };
        let target = ExecutionTarget {
            target: TargetRef::new("App", "AppTests"),
            hash: ContentHash::from_bytes(b"x"),
        };
        assert!(executor.run(&[target]).is_success());
        assert!(!executor.run(&[]).is_success());
    }
}
