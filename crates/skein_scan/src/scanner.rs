//! Pattern-based import extraction over files and whole targets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use crate::language::{LanguageFamily, SourceLanguage};

// `import X`, `@testable import X`, `@_spi(Foo) import X`, `import struct X.Y`
static SWIFT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:@\w+(?:\([^)\n]*\))?[ \t]+)*import[ \t]+(?:(?:typealias|struct|class|enum|protocol|let|var|func)[ \t]+)?([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("swift import pattern compiles")
});

// `@import X;` and `@import X.Y;`
static CLANG_MODULE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*@import[ \t]+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("module import pattern compiles")
});

// `#import <X/...>` and `#include <X/...>`; bare `<stdio.h>` has no slash
static CLANG_ANGLE_INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*#[ \t]*(?:import|include)[ \t]*<([A-Za-z_][A-Za-z0-9_]*)/")
        .expect("angle include pattern compiles")
});

/// Errors creating a scanner.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The dedicated worker pool could not be started.
    #[error("failed to build scanner thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Extracts imported module names from source text.
///
/// Comments and string literals are removed first, keeping line breaks.
pub fn scan_source(source: &str, language: SourceLanguage) -> BTreeSet<String> {
    let stripped = strip_comments(source, language.family());
    let patterns: Vec<&Regex> = match language.family() {
        LanguageFamily::Swift => vec![&*SWIFT_IMPORT],
        LanguageFamily::Clang => vec![&*CLANG_MODULE_IMPORT, &*CLANG_ANGLE_INCLUDE],
    };
    patterns
        .iter()
        .flat_map(|re| re.captures_iter(&stripped))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Blanks comments and string literals, keeping their line breaks so that
/// line anchoring still holds for the code that follows them.
///
/// Swift block comments nest and Swift has `"""` multi-line strings.
/// C-family block comments end at the first `*/` and `'` opens a character
/// literal.
fn strip_comments(source: &str, family: LanguageFamily) -> String {
    let swift = family == LanguageFamily::Swift;
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        i += if rest.starts_with(b"//") {
            rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len())
        } else if rest.starts_with(b"/*") {
            skip_block_comment(rest, swift, &mut out)
        } else if swift && rest.starts_with(b"\"\"\"") {
            skip_literal(rest, b"\"\"\"", true, &mut out)
        } else if rest[0] == b'"' || (!swift && rest[0] == b'\'') {
            skip_literal(rest, &rest[..1], false, &mut out)
        } else {
            out.push(rest[0]);
            1
        };
    }
    // Only whole runs between ASCII delimiters are dropped.
    String::from_utf8_lossy(&out).into_owned()
}

/// Length of the block comment opening `rest`.
fn skip_block_comment(rest: &[u8], nested: bool, out: &mut Vec<u8>) -> usize {
    let mut depth = 1usize;
    let mut i = 2;
    while i < rest.len() {
        if nested && rest[i..].starts_with(b"/*") {
            depth += 1;
            i += 2;
        } else if rest[i..].starts_with(b"*/") {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            if rest[i] == b'\n' {
                out.push(b'\n');
            }
            i += 1;
        }
    }
    rest.len()
}

/// Length of the literal opening `rest`. Single-line literals also end at
/// a line break, which is left for the caller.
fn skip_literal(rest: &[u8], delimiter: &[u8], multiline: bool, out: &mut Vec<u8>) -> usize {
    let mut i = delimiter.len();
    while i < rest.len() {
        match rest[i] {
            b'\\' => i += 2,
            b'\n' if !multiline => return i,
            b'\n' => {
                out.push(b'\n');
                i += 1;
            }
            _ if rest[i..].starts_with(delimiter) => return i + delimiter.len(),
            _ => i += 1,
        }
    }
    rest.len()
}

/// Scans source files for imported module names.
///
/// By default work runs on the global rayon pool; [`ImportScanner::with_threads`]
/// bounds it to a dedicated pool.
#[derive(Debug, Default)]
pub struct ImportScanner {
    pool: Option<rayon::ThreadPool>,
}

impl ImportScanner {
    /// A scanner using the global rayon pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// A scanner bounded to `threads` workers. `0` uses the global pool.
    pub fn with_threads(threads: usize) -> Result<Self, ScanError> {
        if threads == 0 {
            return Ok(Self::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("skein-scan-{i}"))
            .build()?;
        Ok(Self { pool: Some(pool) })
    }

    /// Scans one file.
    ///
    /// Unreadable and non-UTF-8 files yield an empty set; the failure is
    /// logged and never propagated.
    pub fn scan_file(&self, path: &Path, language: SourceLanguage) -> BTreeSet<String> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable source");
                return BTreeSet::new();
            }
        };
        match String::from_utf8(bytes) {
            Ok(text) => scan_source(&text, language),
            Err(_) => {
                debug!(path = %path.display(), "skipping non-UTF-8 source");
                BTreeSet::new()
            }
        }
    }

    /// Scans every recognised file of a target and returns the union of
    /// their imports, minus the target's own product name.
    ///
    /// Files with unknown extensions are ignored.
    pub fn scan_target(&self, files: &[PathBuf], own_name: &str) -> BTreeSet<String> {
        let work = || {
            files
                .par_iter()
                .filter_map(|f| SourceLanguage::from_path(f).map(|lang| (f, lang)))
                .map(|(f, lang)| self.scan_file(f, lang))
                .reduce(BTreeSet::new, |mut acc, set| {
                    acc.extend(set);
                    acc
                })
        };
        let mut imports = match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        };
        imports.remove(own_name);
        imports
    }
}
