//! Whole-graph validation: edge resolution and cycle detection.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::GraphError;
use crate::model::{Graph, Resolved, TargetRef};

impl Graph {
    /// Checks that every edge resolves and that the graph is acyclic.
    ///
    /// Runs once per invocation before any hashing or cache interaction.
    /// Edges are checked in target order, so the first unresolved edge
    /// reported is deterministic. When several cycles exist, the one whose
    /// smallest member sorts first is returned and the rest are logged.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut dag: DiGraph<TargetRef, ()> = DiGraph::new();
        let mut index: HashMap<TargetRef, NodeIndex> = HashMap::new();
        for (target_ref, _) in self.targets() {
            let node = dag.add_node(target_ref.clone());
            index.insert(target_ref, node);
        }

        for (from, target) in self.targets() {
            for dependency in &target.dependencies {
                if let Resolved::Target(to) = self.resolve(&from, dependency)? {
                    dag.update_edge(index[&from], index[&to], ());
                }
            }
        }

        let mut cycles: Vec<Vec<TargetRef>> = tarjan_scc(&dag)
            .into_iter()
            .filter(|scc| scc.len() > 1 || dag.find_edge(scc[0], scc[0]).is_some())
            .map(|scc| {
                let mut members: Vec<TargetRef> = scc.into_iter().map(|n| dag[n].clone()).collect();
                members.sort();
                members
            })
            .collect();
        if cycles.is_empty() {
            debug!(
                targets = dag.node_count(),
                edges = dag.edge_count(),
                "graph validated"
            );
            return Ok(());
        }

        cycles.sort();
        for extra in cycles.iter().skip(1) {
            let names: Vec<String> = extra.iter().map(ToString::to_string).collect();
            debug!(members = %names.join(", "), "additional dependency cycle");
        }
        let members = cycles.swap_remove(0);
        Err(GraphError::DependencyCycle { members })
    }
}
