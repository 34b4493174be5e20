//! The full selective test run.

use skein_cache::{open_store, CacheStore};
use skein_common::ExecutionContext;
use skein_config::{load_config, SkeinConfig};
use skein_graph::{Graph, GraphTraverser};
use skein_hash::ContentHasher;
use skein_lint::ImplicitDependencyLinter;
use skein_scan::ImportScanner;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, TestExecutor};
use crate::logging::init_logging;
use crate::report::RunReport;
use crate::request::TestRequest;
use crate::selective::{record_success, SelectiveDecision};

/// Runs requests against graphs with one configuration and cache store.
pub struct Engine {
    store: Box<dyn CacheStore>,
    scanner: ImportScanner,
    linter: ImplicitDependencyLinter,
    additional_strings: Vec<String>,
}

impl Engine {
    /// Loads `skein.toml` from the workspace root, installs logging, and
    /// builds an engine from it.
    pub fn open(ctx: &ExecutionContext) -> Result<Self, EngineError> {
        let config = load_config(ctx.root())?;
        init_logging(&config.log);
        debug!(root = %ctx.root().display(), "opening engine");
        Self::new(&config, ctx)
    }

    /// Builds an engine from configuration, opening the configured store.
    pub fn new(config: &SkeinConfig, ctx: &ExecutionContext) -> Result<Self, EngineError> {
        let store = open_store(&config.cache, ctx)?;
        Self::with_store(config, store)
    }

    /// Builds an engine around an already opened store.
    pub fn with_store(config: &SkeinConfig, store: Box<dyn CacheStore>) -> Result<Self, EngineError> {
        Ok(Self {
            store,
            scanner: ImportScanner::with_threads(config.scan.threads)?,
            linter: ImplicitDependencyLinter::new(&config.lint),
            additional_strings: config.selective.additional_strings.clone(),
        })
    }

    /// The cache store.
    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    /// Runs `request` against `graph`.
    ///
    /// 1. Validates the graph; any unresolved edge or cycle aborts here.
    /// 2. Resolves and filters the scheme's test targets.
    /// 3. Lints the whole graph while hashing the selected targets.
    /// 4. Skips targets already recorded at their current hash.
    /// 5. Hands the rest to `executor`, unless nothing is left.
    /// 6. After success, records the executed targets.
    pub fn run(
        &self,
        ctx: &ExecutionContext,
        graph: &Graph,
        request: &TestRequest,
        executor: &dyn TestExecutor,
    ) -> Result<RunReport, EngineError> {
        graph.validate()?;
        let traverser = GraphTraverser::new(graph);
        let selected = request.select(&traverser)?;
        debug!(scheme = %request.scheme, targets = selected.len(), "selected test targets");

        let mut additional_strings = self.additional_strings.clone();
        additional_strings.extend(request.additional_strings.iter().cloned());
        let hasher = ContentHasher::new(graph, ctx, &additional_strings);

        let (issues, hashed) = rayon::join(
            || self.linter.lint(graph, ctx, &self.scanner),
            || hasher.hash_all(&selected),
        );
        let issues = issues?;
        hashed?;

        let decision =
            SelectiveDecision::decide(&hasher, self.store(), &selected, request.ignore_selective_testing)?;
        let to_run = decision.to_run();
        if to_run.is_empty() {
            info!("nothing to run");
            return Ok(RunReport::new(&decision, issues, ExecutionOutcome::Succeeded));
        }

        info!(targets = to_run.len(), "running tests");
        let outcome = executor.run(&to_run);
        let mut report = RunReport::new(&decision, issues, outcome);
        if outcome.is_success() {
            report.warnings.extend(record_success(&decision, self.store()));
        } else {
            info!("test run failed, nothing recorded");
        }
        Ok(report)
    }
}
