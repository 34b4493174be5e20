//! Diagnostic rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders a batch of diagnostics, one after another.
    fn render_all(&self, diags: &[Diagnostic]) -> String {
        diags.iter().map(|d| self.render(d)).collect()
    }
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// warning[W101]: target 'Core' imports targets it does not declare: Models
///   --> target Core
///    = help: add a dependency on each listed target
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint_severity(&self, diag: &Diagnostic) -> String {
        if !self.color {
            return diag.severity.to_string();
        }
        let ansi = if diag.severity.is_error() { "31" } else { "33" };
        format!("\x1b[1;{ansi}m{}\x1b[0m", diag.severity)
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.paint_severity(diag),
            diag.code,
            diag.message
        );
        if let Some(target) = &diag.target {
            out.push_str(&format!("  --> target {target}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as one line of JSON.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        // Diagnostic contains only strings and enums; serialization cannot fail.
        let mut line = serde_json::to_string(diag).unwrap_or_default();
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    fn sample() -> Diagnostic {
        Diagnostic::warning(
            DiagnosticCode::new(Category::Warning, 101),
            "target 'Core' imports targets it does not declare: Models",
        )
        .with_target("Core")
        .with_help("add a dependency on each listed target")
    }

    #[test]
    fn render_plain() {
        let output = TerminalRenderer::new(false).render(&sample());
        assert!(output.starts_with("warning[W101]: target 'Core'"));
        assert!(output.contains("--> target Core"));
        assert!(output.contains("= help: add a dependency"));
    }

    #[test]
    fn render_color_wraps_severity() {
        let output = TerminalRenderer::new(true).render(&sample());
        assert!(output.contains("\x1b[1;33mwarning\x1b[0m"));
    }

    #[test]
    fn render_without_target() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Error, 1), "dependency cycle detected");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(!output.contains("-->"));
    }

    #[test]
    fn json_lines() {
        let out = JsonRenderer.render_all(&[sample(), sample()]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: Diagnostic = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back, sample());
    }
}
