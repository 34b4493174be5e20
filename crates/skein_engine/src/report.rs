//! Result of a run, for presentation.

use serde::{Serialize, Serializer};
use skein_cache::Provenance;
use skein_common::ContentHash;
use skein_diagnostics::Diagnostic;
use skein_graph::TargetRef;

use crate::executor::ExecutionOutcome;
use crate::selective::SelectiveDecision;

/// What happened to one requested target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    /// The target.
    pub target: TargetRef,
    /// Its hash, serialized as hex.
    #[serde(serialize_with = "hex")]
    pub hash: ContentHash,
    /// Where its cache entry was found.
    pub provenance: Provenance,
    /// Whether it was skipped.
    pub skipped: bool,
}

fn hex<S: Serializer>(hash: &ContentHash, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hash.to_hex())
}

/// Everything a presenter needs after [`Engine::run`](crate::Engine::run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Requested targets in request order.
    pub targets: Vec<TargetReport>,
    /// Lint findings over the whole graph.
    pub issues: Vec<Diagnostic>,
    /// Non-fatal problems, mostly cache trouble.
    pub warnings: Vec<String>,
    /// Executor result; `Succeeded` when nothing had to run.
    pub outcome: ExecutionOutcome,
}

impl RunReport {
    pub(crate) fn new(decision: &SelectiveDecision, issues: Vec<Diagnostic>, outcome: ExecutionOutcome) -> Self {
        Self {
            targets: decision
                .targets()
                .iter()
                .map(|d| TargetReport {
                    target: d.target.clone(),
                    hash: d.hash,
                    provenance: d.provenance,
                    skipped: d.skipped,
                })
                .collect(),
            issues,
            warnings: decision.warnings().to_vec(),
            outcome,
        }
    }

    /// Skipped targets.
    pub fn skipped(&self) -> impl Iterator<Item = &TargetRef> {
        self.targets.iter().filter(|t| t.skipped).map(|t| &t.target)
    }

    /// Targets handed to the executor.
    pub fn executed(&self) -> impl Iterator<Item = &TargetRef> {
        self.targets.iter().filter(|t| !t.skipped).map(|t| &t.target)
    }

    /// Returns `true` if the run succeeded or had nothing to run.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape() {
        let report = RunReport {
            targets: vec![TargetReport {
                target: TargetRef::new("App", "CoreTests"),
                hash: ContentHash::from_bytes(b"core"),
                provenance: Provenance::Remote,
                skipped: true,
            }],
            issues: Vec::new(),
            warnings: vec!["remote slow".into()],
            outcome: ExecutionOutcome::Succeeded,
        };
        let value: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(value["outcome"], "succeeded");
        assert_eq!(value["targets"][0]["provenance"], "remote");
        assert_eq!(value["targets"][0]["target"]["name"], "CoreTests");
        assert_eq!(
            value["targets"][0]["hash"],
            ContentHash::from_bytes(b"core").to_hex()
        );
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.executed().count(), 0);
    }
}
