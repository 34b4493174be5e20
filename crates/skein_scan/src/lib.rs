//! Lexical import scanning for Swift and Clang-family source files.
//!
//! The scanner extracts the names of modules a source file imports. It does
//! not parse: block comments are stripped and a handful of line-anchored
//! patterns are matched. Results feed the implicit dependency linter.

#![warn(missing_docs)]

pub mod language;
pub mod scanner;

pub use language::{LanguageFamily, SourceLanguage};
pub use scanner::{scan_source, ImportScanner, ScanError};
