//! W102: a target declares a dependency its sources never import.

use skein_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
use skein_graph::{GraphError, TargetRef};

use crate::context::LintContext;
use crate::LintRule;

/// Detects declared target dependencies whose module is never imported.
///
/// Only importable products count: an app embedding its extensions or a
/// UI test bundle depending on its host app never names them in source.
/// Targets without files are skipped since nothing was scanned for them.
pub struct RedundantDependency;

impl LintRule for RedundantDependency {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::new(Category::Warning, 102)
    }

    fn name(&self) -> &str {
        "redundant-dependency"
    }

    fn description(&self) -> &str {
        "target declares a dependency it never imports"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_target(
        &self,
        target: &TargetRef,
        cx: &LintContext<'_>,
        sink: &DiagnosticSink,
    ) -> Result<(), GraphError> {
        let Some(scanned) = cx.imports(target) else {
            return Ok(());
        };
        if cx.traverser().target(target)?.files().next().is_none() {
            return Ok(());
        }
        let redundant: Vec<&str> = cx
            .declared_modules(target)?
            .into_iter()
            .filter(|(module, dep)| dep.product.is_importable() && !scanned.contains(module))
            .map(|(_, dep)| dep.module_name())
            .collect();
        if redundant.is_empty() {
            return Ok(());
        }

        sink.emit(
            Diagnostic::new(
                self.default_severity(),
                self.code(),
                format!(
                    "target '{}' declares dependencies it never imports: {}",
                    target.name,
                    redundant.join(", ")
                ),
            )
            .with_target(target.name.clone())
            .with_note(format!("in project {}", target.project.display()))
            .with_help("remove each listed dependency or import it"),
        );
        Ok(())
    }
}
