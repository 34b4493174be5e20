//! Shared inputs handed to every lint rule.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use skein_common::ExecutionContext;
use skein_graph::{Graph, GraphError, GraphTraverser, Target, TargetRef};
use skein_scan::ImportScanner;
use tracing::debug;

/// The graph plus the imports scanned from each target.
///
/// Imports name modules, so targets are matched by
/// [`Target::module_name`] rather than by target name.
pub struct LintContext<'g> {
    traverser: GraphTraverser<'g>,
    module_names: BTreeSet<String>,
    imports: HashMap<TargetRef, BTreeSet<String>>,
}

impl<'g> LintContext<'g> {
    /// Builds a context from precomputed imports.
    ///
    /// Targets missing from `imports` are treated as importing nothing.
    pub fn new(graph: &'g Graph, imports: HashMap<TargetRef, BTreeSet<String>>) -> Self {
        Self {
            traverser: GraphTraverser::new(graph),
            module_names: graph.targets().map(|(_, t)| t.module_name().to_string()).collect(),
            imports,
        }
    }

    /// Scans the sources and headers of every target in parallel and builds
    /// a context from the results.
    pub fn scan(graph: &'g Graph, ctx: &ExecutionContext, scanner: &ImportScanner) -> Self {
        let imports: HashMap<TargetRef, BTreeSet<String>> = graph
            .targets()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(target_ref, target)| {
                let files: Vec<_> = target.files().map(|f| ctx.resolve(f)).collect();
                let found = scanner.scan_target(&files, target.module_name());
                debug!(target = %target_ref, imports = found.len(), "scanned target");
                (target_ref, found)
            })
            .collect();
        Self::new(graph, imports)
    }

    /// Traversal queries over the graph.
    pub fn traverser(&self) -> &GraphTraverser<'g> {
        &self.traverser
    }

    /// Module names of every target in the graph.
    pub fn module_names(&self) -> &BTreeSet<String> {
        &self.module_names
    }

    /// The direct target dependencies of `target`, keyed by module name.
    pub fn declared_modules(&self, target: &TargetRef) -> Result<BTreeMap<String, &'g Target>, GraphError> {
        let mut out = BTreeMap::new();
        for dep in self.traverser.direct_dependencies(target)? {
            let resolved = self.traverser.target(&dep)?;
            out.insert(resolved.module_name().to_string(), resolved);
        }
        Ok(out)
    }

    /// Imports scanned from `target`, or `None` if it was not scanned.
    pub fn imports(&self, target: &TargetRef) -> Option<&BTreeSet<String>> {
        self.imports.get(target)
    }
}
