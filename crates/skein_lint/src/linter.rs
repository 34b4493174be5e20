//! Entry point combining import scanning with the lint engine.

use skein_common::ExecutionContext;
use skein_config::LintConfig;
use skein_diagnostics::{Diagnostic, DiagnosticSink};
use skein_graph::{Graph, GraphError};
use skein_scan::ImportScanner;
use tracing::info;

use crate::context::LintContext;
use crate::engine::LintEngine;

/// Reports targets that import other targets without declaring them, and
/// declared target dependencies that are never imported.
///
/// The linter only reads: the graph is never modified and findings are
/// returned to the caller for presentation.
pub struct ImplicitDependencyLinter {
    engine: LintEngine,
}

impl ImplicitDependencyLinter {
    /// Creates a linter honouring the allow and deny lists in `config`.
    pub fn new(config: &LintConfig) -> Self {
        Self {
            engine: LintEngine::new(config),
        }
    }

    /// Scans every target in the graph and runs the enabled rules.
    ///
    /// Diagnostics are ordered by target ref.
    pub fn lint(
        &self,
        graph: &Graph,
        ctx: &ExecutionContext,
        scanner: &ImportScanner,
    ) -> Result<Vec<Diagnostic>, GraphError> {
        let cx = LintContext::scan(graph, ctx, scanner);
        let sink = DiagnosticSink::new();
        self.engine.run(&cx, &sink)?;
        if sink.warning_count() + sink.error_count() > 0 {
            info!(
                warnings = sink.warning_count(),
                errors = sink.error_count(),
                "implicit dependencies found"
            );
        }
        Ok(sink.take_all())
    }
}

impl Default for ImplicitDependencyLinter {
    fn default() -> Self {
        Self::new(&LintConfig::default())
    }
}
