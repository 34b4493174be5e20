//! Collects diagnostics from lint rules.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Shared collector for lint findings.
///
/// Rules get a `&DiagnosticSink` and may be called from scanner worker
/// threads, so emission only needs a shared reference. Findings keep their
/// emission order.
pub struct DiagnosticSink {
    findings: Mutex<Vec<Diagnostic>>,
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

impl DiagnosticSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self {
            findings: Mutex::new(Vec::new()),
            errors: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        }
    }

    /// Records a finding.
    pub fn emit(&self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.errors.fetch_add(1, Ordering::Relaxed),
            Severity::Warning => self.warnings.fetch_add(1, Ordering::Relaxed),
            Severity::Note => 0,
        };
        self.findings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diag);
    }

    /// Returns `true` if a denied rule fired.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Findings at error severity so far.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Findings at warning severity so far.
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    /// Drains the findings. Counters are not reset.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.findings.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Findings about the named target, without draining.
    pub fn for_target(&self, target: &str) -> Vec<Diagnostic> {
        self.findings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.target.as_deref() == Some(target))
            .cloned()
            .collect()
    }

    /// A copy of every finding, without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.findings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}
