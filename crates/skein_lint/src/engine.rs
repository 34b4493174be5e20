//! Lint engine that manages rule registration, configuration, and execution.
//!
//! The `LintEngine` accepts a `LintConfig` to control which rules are denied
//! or allowed, then iterates over all targets in the graph running each
//! enabled rule.

use std::collections::HashSet;

use skein_config::LintConfig;
use skein_diagnostics::{DiagnosticSink, Severity};
use skein_graph::GraphError;

use crate::context::LintContext;
use crate::rules::register_builtin_rules;
use crate::LintRule;

/// The lint engine that orchestrates running lint rules over a graph.
///
/// Rules are registered at construction time. The engine respects the
/// `LintConfig` to suppress rules (allow), promote rules to errors (deny),
/// or keep them at their default severity.
pub struct LintEngine {
    /// All registered lint rules.
    rules: Vec<Box<dyn LintRule>>,
    /// Rule names that should be promoted to error severity.
    denied: HashSet<String>,
    /// Rule names that should be suppressed (not reported).
    allowed: HashSet<String>,
}

impl LintEngine {
    /// Creates a new lint engine configured by the given `LintConfig`.
    ///
    /// All builtin rules are registered automatically. Rules listed in
    /// `config.deny` are promoted to error severity, and rules listed
    /// in `config.allow` are suppressed entirely.
    pub fn new(config: &LintConfig) -> Self {
        let mut engine = Self {
            rules: Vec::new(),
            denied: config.deny.iter().cloned().collect(),
            allowed: config.allow.iter().cloned().collect(),
        };
        register_builtin_rules(&mut engine);
        engine
    }

    /// Creates a new lint engine with default configuration (no overrides).
    pub fn with_defaults() -> Self {
        Self::new(&LintConfig::default())
    }

    /// Registers a lint rule with the engine.
    pub fn register(&mut self, rule: Box<dyn LintRule>) {
        self.rules.push(rule);
    }

    /// Returns the number of registered rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns the names of all registered rules.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Runs all enabled lint rules on every target in the graph.
    ///
    /// Targets are visited in ref order. Allowed rules are skipped, and
    /// diagnostics from denied rules are promoted to error severity.
    pub fn run(&self, cx: &LintContext<'_>, sink: &DiagnosticSink) -> Result<(), GraphError> {
        for target in cx.traverser().all_targets() {
            for rule in &self.rules {
                if self.allowed.contains(rule.name()) {
                    continue;
                }

                // Capture into a temporary sink so severity can be adjusted
                let temp_sink = DiagnosticSink::new();
                rule.check_target(&target, cx, &temp_sink)?;

                let is_denied = self.denied.contains(rule.name());
                for mut diag in temp_sink.take_all() {
                    if is_denied {
                        diag.severity = Severity::Error;
                    }
                    sink.emit(diag);
                }
            }
        }
        Ok(())
    }
}
