//! Source languages recognised by the scanner.

use std::path::Path;

/// A scannable source language, derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    /// `.swift`
    Swift,
    /// `.m`
    ObjectiveC,
    /// `.mm`
    ObjectiveCpp,
    /// `.c`
    C,
    /// `.cc`, `.cpp`, `.cxx`
    Cpp,
    /// `.h`, `.hh`, `.hpp`
    Header,
}

/// Import syntax shared by a group of languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    /// `import X` declarations.
    Swift,
    /// `@import`, `#import`, and `#include` directives.
    Clang,
}

impl SourceLanguage {
    /// Maps a file extension (without the dot) to a language.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "swift" => Some(SourceLanguage::Swift),
            "m" => Some(SourceLanguage::ObjectiveC),
            "mm" => Some(SourceLanguage::ObjectiveCpp),
            "c" => Some(SourceLanguage::C),
            "cc" | "cpp" | "cxx" => Some(SourceLanguage::Cpp),
            "h" | "hh" | "hpp" => Some(SourceLanguage::Header),
            _ => None,
        }
    }

    /// Detects the language of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The import syntax this language uses.
    pub fn family(self) -> LanguageFamily {
        match self {
            SourceLanguage::Swift => LanguageFamily::Swift,
            _ => LanguageFamily::Clang,
        }
    }
}
