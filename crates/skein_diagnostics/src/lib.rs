//! Diagnostic creation, severity management, and rendering.
//!
//! Lint issues and cache degradation warnings are reported as structured
//! [`Diagnostic`] values. The thread-safe [`DiagnosticSink`] accumulates them
//! while stages run in parallel, and [`DiagnosticRenderer`] implementations
//! format them for a terminal or as JSON for a presenter.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
