//! W101: a target imports another target without declaring it.

use skein_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
use skein_graph::{GraphError, TargetRef};

use crate::context::LintContext;
use crate::LintRule;

/// Detects targets whose sources import other graph targets without a
/// declared dependency edge.
///
/// Imports that match no target's module name (system frameworks, packages)
/// are not considered. At most one diagnostic is emitted per target, listing every
/// implicit import in sorted order.
pub struct ImplicitDependency;

impl LintRule for ImplicitDependency {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::new(Category::Warning, 101)
    }

    fn name(&self) -> &str {
        "implicit-dependency"
    }

    fn description(&self) -> &str {
        "target imports a target it does not declare as a dependency"
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
        let declared = cx.declared_modules(target)?;
        let implicit: Vec<&str> = scanned
            .iter()
            .filter(|name| cx.module_names().contains(*name) && !declared.contains_key(*name))
            .map(String::as_str)
            .collect();
        if implicit.is_empty() {
            return Ok(());
        }

        sink.emit(
            Diagnostic::new(
                self.default_severity(),
                self.code(),
                format!(
                    "target '{}' imports targets it does not declare: {}",
                    target.name,
                    implicit.join(", ")
                ),
            )
            .with_target(target.name.clone())
            .with_note(format!("in project {}", target.project.display()))
            .with_help("declare each listed target as a dependency"),
        );
        Ok(())
    }
}
