//! Conformance test helpers for the skein selective test engine.
//!
//! Provides on-disk workspaces, graph fixtures, and test doubles for the
//! executor and the remote cache, so integration tests can drive the whole
//! graph → hash → cache → decision pipeline.

#![warn(missing_docs)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use skein_cache::{CacheCategory, CacheItem, RemoteTransport, TransportError};
use skein_common::ExecutionContext;
use skein_engine::{ExecutionOutcome, ExecutionTarget, TestExecutor};
use skein_graph::{Dependency, Graph, Product, Project, Scheme, Target, TargetRef, TestAction};
use tempfile::TempDir;

/// A temporary checkout with source files.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Creates a workspace holding `files` as `(relative path, contents)`.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let ws = Self::new();
        for (path, body) in files {
            ws.write(path, body);
        }
        ws
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Context rooted at this workspace.
    pub fn ctx(&self) -> ExecutionContext {
        ExecutionContext::new(self.root()).with_tool_version("conformance")
    }

    /// Writes a file, creating parent directories.
    pub fn write(&self, path: &str, body: &str) {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(full, body).expect("write fixture file");
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a target in the `App` project.
pub fn app(name: &str) -> TargetRef {
    TargetRef::new("App", name)
}

/// Sources for [`layered_graph`].
pub const LAYERED_FILES: &[(&str, &str)] = &[
    ("App/Sources/Core/Core.swift", "public struct Core {}\n"),
    ("App/Sources/Core/Core.h", "#import <Foundation/Foundation.h>\n"),
    ("App/Sources/Feature/Feature.swift", "import Core\npublic struct Feature {}\n"),
    ("App/Sources/App/App.swift", "import Feature\nimport Core\n"),
    ("App/Tests/CoreTests/CoreTests.swift", "import XCTest\n@testable import Core\n"),
    ("App/Tests/FeatureTests/FeatureTests.swift", "import XCTest\n@testable import Feature\n"),
    ("App/Tests/AppUITests/AppUITests.swift", "import XCTest\n"),
];

/// One project, four layers:
///
/// ```text
/// AppUITests -> App -> Feature -> Core -> package:Collections
///                  \-----------------^
/// CoreTests -> Core      FeatureTests -> Feature
/// ```
///
/// The `App` scheme tests `CoreTests`, `FeatureTests`, and `AppUITests`.
pub fn layered_graph() -> Graph {
    let project = Project::new("App", "App")
        .with_target(
            Target::new("Core", Product::Framework)
                .with_sources(["App/Sources/Core/Core.swift"])
                .with_headers(["App/Sources/Core/Core.h"])
                .with_dependency(Dependency::Package {
                    product: "Collections".into(),
                }),
        )
        .with_target(
            Target::new("Feature", Product::Framework)
                .with_sources(["App/Sources/Feature/Feature.swift"])
                .with_dependency(Dependency::target("Core")),
        )
        .with_target(
            Target::new("App", Product::App)
                .with_sources(["App/Sources/App/App.swift"])
                .with_dependency(Dependency::target("Feature"))
                .with_dependency(Dependency::target("Core")),
        )
        .with_target(
            Target::new("CoreTests", Product::UnitTests)
                .with_sources(["App/Tests/CoreTests/CoreTests.swift"])
                .with_dependency(Dependency::target("Core")),
        )
        .with_target(
            Target::new("FeatureTests", Product::UnitTests)
                .with_sources(["App/Tests/FeatureTests/FeatureTests.swift"])
                .with_dependency(Dependency::target("Feature")),
        )
        .with_target(
            Target::new("AppUITests", Product::UiTests)
                .with_sources(["App/Tests/AppUITests/AppUITests.swift"])
                .with_dependency(Dependency::target("App")),
        )
        .with_scheme(Scheme::new("App").with_test_action(TestAction {
            targets: vec![app("CoreTests"), app("FeatureTests"), app("AppUITests")],
            test_plans: Vec::new(),
        }));
    Graph::new([project], Vec::new()).expect("fixture graph")
}

/// Executor that records every call and returns a fixed outcome.
pub struct RecordingExecutor {
    outcome: ExecutionOutcome,
    calls: RefCell<Vec<Vec<String>>>,
}

impl RecordingExecutor {
    /// An executor whose runs all succeed.
    pub fn passing() -> Self {
        Self::with_outcome(ExecutionOutcome::Succeeded)
    }

    /// An executor whose runs all fail.
    pub fn failing() -> Self {
        Self::with_outcome(ExecutionOutcome::Failed)
    }

    fn with_outcome(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Target names passed to each call.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl TestExecutor for RecordingExecutor {
    fn run(&self, targets: &[ExecutionTarget]) -> ExecutionOutcome {
        self.calls
            .borrow_mut()
            .push(targets.iter().map(|t| t.target.name.clone()).collect());
        self.outcome
    }
}

/// Remote transport that always times out and counts its calls.
///
/// Clones share their counters, so a test can keep one handle while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct TimeoutTransport {
    exists_calls: Arc<AtomicUsize>,
    put_calls: Arc<AtomicUsize>,
}

impl TimeoutTransport {
    /// Number of `exists` round trips attempted.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Number of `put` round trips attempted.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

impl RemoteTransport for TimeoutTransport {
    fn exists(&self, _category: CacheCategory, _items: &[CacheItem]) -> Result<BTreeSet<CacheItem>, TransportError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Timeout("deadline exceeded".into()))
    }

    fn put(&self, _category: CacheCategory, _items: &[CacheItem]) -> Result<(), TransportError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Timeout("deadline exceeded".into()))
    }
}
