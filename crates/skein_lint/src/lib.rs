//! Lint rules and engine for static analysis of the project graph.
//!
//! Rules run per target against a [`LintContext`] holding the graph and the
//! imports scanned from every target's sources. Findings are advisory: they
//! are reported as diagnostics and never change the graph.
//!
//! # Rule Categories
//!
//! - **W-series (warnings):** implicit and redundant dependencies

#![warn(missing_docs)]

mod context;
mod engine;
mod linter;
mod rules;

pub use context::LintContext;
pub use engine::LintEngine;
pub use linter::ImplicitDependencyLinter;
pub use rules::register_builtin_rules;
pub use rules::{ImplicitDependency, RedundantDependency};

use skein_diagnostics::{DiagnosticCode, DiagnosticSink, Severity};
use skein_graph::{GraphError, TargetRef};

/// A single lint rule that checks a target for dependency issues.
///
/// Each rule has a unique diagnostic code, a human-readable name, a description,
/// and a default severity. The `check_target` method is called for each target
/// in the graph and should emit diagnostics via the provided sink.
pub trait LintRule: Send + Sync {
    /// Returns the diagnostic code for this rule (e.g., W101).
    fn code(&self) -> DiagnosticCode;

    /// Returns the short kebab-case name of this rule (e.g., "implicit-dependency").
    fn name(&self) -> &str;

    /// Returns a human-readable description of what this rule checks.
    fn description(&self) -> &str;

    /// Returns the default severity for diagnostics emitted by this rule.
    fn default_severity(&self) -> Severity;

    /// Checks a single target and emits diagnostics to the sink.
    ///
    /// Fails only when the graph itself is malformed.
    fn check_target(
        &self,
        target: &TargetRef,
        cx: &LintContext<'_>,
        sink: &DiagnosticSink,
    ) -> Result<(), GraphError>;
}
