//! Read-only dependency and test-target queries over a [`Graph`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::GraphError;
use crate::model::{Graph, Resolved, Target, TargetRef};

/// Answers dependency questions about a graph.
///
/// The traverser borrows the graph and holds no state of its own, so it can
/// be created freely and shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct GraphTraverser<'g> {
    graph: &'g Graph,
}

impl<'g> GraphTraverser<'g> {
    /// Creates a traverser over `graph`.
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// The underlying graph.
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Looks up a target, failing if it is not in the graph.
    pub fn target(&self, target: &TargetRef) -> Result<&'g Target, GraphError> {
        self.graph
            .target(target)
            .ok_or_else(|| GraphError::UnknownTarget(target.clone()))
    }

    /// Every target in the graph, in ref order.
    pub fn all_targets(&self) -> Vec<TargetRef> {
        self.graph.targets().map(|(r, _)| r).collect()
    }

    /// The names of every target in the graph.
    pub fn target_names(&self) -> BTreeSet<String> {
        self.graph.targets().map(|(r, _)| r.name).collect()
    }

    /// Targets reachable from `target` through one same-project or
    /// cross-project edge. Terminal leaves are excluded.
    pub fn direct_dependencies(&self, target: &TargetRef) -> Result<BTreeSet<TargetRef>, GraphError> {
        let mut out = BTreeSet::new();
        for dependency in &self.target(target)?.dependencies {
            if let Resolved::Target(r) = self.graph.resolve(target, dependency)? {
                out.insert(r);
            }
        }
        Ok(out)
    }

    /// Locator strings of the terminal leaves `target` depends on directly.
    pub fn direct_leaves(&self, target: &TargetRef) -> Result<BTreeSet<String>, GraphError> {
        let mut out = BTreeSet::new();
        for dependency in &self.target(target)?.dependencies {
            if let Resolved::Leaf(locator) = self.graph.resolve(target, dependency)? {
                out.insert(locator);
            }
        }
        Ok(out)
    }

    /// The full dependency closure of `target`, excluding `target` itself.
    ///
    /// A cycle is reported as [`GraphError::DependencyCycle`] with its members
    /// in the order the walk entered them.
    pub fn transitive_dependencies(
        &self,
        target: &TargetRef,
    ) -> Result<BTreeSet<TargetRef>, GraphError> {
        let mut walk = Walk::default();
        walk.path.push(target.clone());
        walk.on_path.insert(target.clone());
        self.visit(target, &mut walk)?;
        Ok(walk.done)
    }

    fn visit(&self, node: &TargetRef, walk: &mut Walk) -> Result<(), GraphError> {
        for dep in self.direct_dependencies(node)? {
            if walk.on_path.contains(&dep) {
                return Err(walk.cycle_to(&dep));
            }
            if walk.done.contains(&dep) {
                continue;
            }
            walk.path.push(dep.clone());
            walk.on_path.insert(dep.clone());
            self.visit(&dep, walk)?;
            walk.path.pop();
            walk.on_path.remove(&dep);
            walk.done.insert(dep);
        }
        Ok(())
    }

    /// Groups `roots` and their closure by depth.
    ///
    /// Level 0 holds targets without graph dependencies; every target in
    /// level `n` depends only on targets in levels below `n`. Each level is
    /// sorted.
    pub fn topological_levels(&self, roots: &[TargetRef]) -> Result<Vec<Vec<TargetRef>>, GraphError> {
        let mut depths: HashMap<TargetRef, usize> = HashMap::new();
        let mut walk = Walk::default();
        for root in roots {
            self.depth(root, &mut depths, &mut walk)?;
        }
        let mut by_level: BTreeMap<usize, Vec<TargetRef>> = BTreeMap::new();
        for (target, depth) in depths {
            by_level.entry(depth).or_default().push(target);
        }
        Ok(by_level
            .into_values()
            .map(|mut level| {
                level.sort();
                level
            })
            .collect())
    }

    fn depth(
        &self,
        node: &TargetRef,
        depths: &mut HashMap<TargetRef, usize>,
        walk: &mut Walk,
    ) -> Result<usize, GraphError> {
        if let Some(&d) = depths.get(node) {
            return Ok(d);
        }
        if walk.on_path.contains(node) {
            return Err(walk.cycle_to(node));
        }
        walk.path.push(node.clone());
        walk.on_path.insert(node.clone());
        let mut depth = 0;
        for dep in self.direct_dependencies(node)? {
            depth = depth.max(self.depth(&dep, depths, walk)? + 1);
        }
        walk.path.pop();
        walk.on_path.remove(node);
        depths.insert(node.clone(), depth);
        Ok(depth)
    }

    /// Resolves the test targets of a scheme, optionally scoped to one test
    /// plan, in declaration order without duplicates.
    ///
    /// A scheme without a test action has no testable targets.
    pub fn testable_targets(
        &self,
        scheme: &str,
        test_plan: Option<&str>,
    ) -> Result<Vec<TargetRef>, GraphError> {
        let found = self
            .graph
            .scheme(scheme)
            .ok_or_else(|| GraphError::SchemeNotFound(scheme.to_string()))?;
        let Some(action) = &found.test_action else {
            return match test_plan {
                Some(plan) => Err(GraphError::TestPlanNotFound {
                    scheme: scheme.to_string(),
                    plan: plan.to_string(),
                }),
                None => Ok(Vec::new()),
            };
        };
        let declared = match test_plan {
            None => &action.targets,
            Some(plan) => {
                &action
                    .test_plans
                    .iter()
                    .find(|p| p.name == plan)
                    .ok_or_else(|| GraphError::TestPlanNotFound {
                        scheme: scheme.to_string(),
                        plan: plan.to_string(),
                    })?
                    .targets
            }
        };

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(declared.len());
        for target in declared {
            self.target(target)?;
            if seen.insert(target) {
                out.push(target.clone());
            }
        }
        Ok(out)
    }
}

#[derive(Default)]
struct Walk {
    path: Vec<TargetRef>,
    on_path: HashSet<TargetRef>,
    done: BTreeSet<TargetRef>,
}

impl Walk {
    fn cycle_to(&self, entry: &TargetRef) -> GraphError {
        let start = self.path.iter().position(|p| p == entry).unwrap_or(0);
        GraphError::DependencyCycle {
            members: self.path[start..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, Product, Project, Scheme, TestAction, TestPlan};

    fn r(name: &str) -> TargetRef {
        TargetRef::new("App", name)
    }

    fn graph_of(targets: Vec<Target>, schemes: Vec<Scheme>) -> Graph {
        let project = targets
            .into_iter()
            .fold(Project::new("App", "App"), Project::with_target);
        Graph::new([project], schemes).unwrap()
    }

    /// App -> {Feature, Core}; Feature -> Core; Core -> package.
    fn layered() -> Graph {
        graph_of(
            vec![
                Target::new("App", Product::App)
                    .with_dependency(Dependency::target("Feature"))
                    .with_dependency(Dependency::target("Core")),
                Target::new("Feature", Product::Framework).with_dependency(Dependency::target("Core")),
                Target::new("Core", Product::Framework).with_dependency(Dependency::Package {
                    product: "Logging".to_string(),
                }),
                Target::new("CoreTests", Product::UnitTests).with_dependency(Dependency::target("Core")),
                Target::new("AppUITests", Product::UiTests).with_dependency(Dependency::target("App")),
            ],
            vec![Scheme::new("App").with_test_action(TestAction {
                targets: vec![r("CoreTests"), r("AppUITests"), r("CoreTests")],
                test_plans: vec![TestPlan {
                    name: "Unit".to_string(),
                    targets: vec![r("CoreTests")],
                }],
            })],
        )
    }

    #[test]
    fn direct_dependencies_exclude_leaves() {
        let graph = layered();
        let t = GraphTraverser::new(&graph);
        assert!(t.direct_dependencies(&r("Core")).unwrap().is_empty());
        assert_eq!(
            t.direct_leaves(&r("Core")).unwrap(),
            BTreeSet::from(["package:Logging".to_string()])
        );
        assert_eq!(
            t.direct_dependencies(&r("App")).unwrap(),
            BTreeSet::from([r("Core"), r("Feature")])
        );
    }

    #[test]
    fn transitive_closure() {
        let graph = layered();
        let t = GraphTraverser::new(&graph);
        assert_eq!(
            t.transitive_dependencies(&r("AppUITests")).unwrap(),
            BTreeSet::from([r("App"), r("Core"), r("Feature")])
        );
    }

    #[test]
    fn transitive_cycle_reports_members_in_walk_order() {
        let graph = graph_of(
            vec![
                Target::new("Root", Product::App).with_dependency(Dependency::target("A")),
                Target::new("A", Product::Framework).with_dependency(Dependency::target("B")),
                Target::new("B", Product::Framework).with_dependency(Dependency::target("A")),
            ],
            Vec::new(),
        );
        let t = GraphTraverser::new(&graph);
        let err = t.transitive_dependencies(&r("Root")).unwrap_err();
        assert_eq!(
            err,
            GraphError::DependencyCycle {
                members: vec![r("A"), r("B")],
            }
        );
    }

    #[test]
    fn missing_dependency_is_fatal() {
        let graph = graph_of(
            vec![Target::new("A", Product::Framework).with_dependency(Dependency::target("Gone"))],
            Vec::new(),
        );
        let t = GraphTraverser::new(&graph);
        assert!(matches!(
            t.direct_dependencies(&r("A")),
            Err(GraphError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn unknown_target_query() {
        let graph = layered();
        let t = GraphTraverser::new(&graph);
        assert_eq!(
            t.direct_dependencies(&r("Nope")).unwrap_err(),
            GraphError::UnknownTarget(r("Nope"))
        );
    }

    #[test]
    fn levels_group_by_depth() {
        let graph = layered();
        let t = GraphTraverser::new(&graph);
        let levels = t.topological_levels(&[r("AppUITests"), r("CoreTests")]).unwrap();
        assert_eq!(
            levels,
            vec![
                vec![r("Core")],
                vec![r("CoreTests"), r("Feature")],
                vec![r("App")],
                vec![r("AppUITests")],
            ]
        );
    }

    #[test]
    fn levels_detect_cycles() {
        let graph = graph_of(
            vec![
                Target::new("A", Product::Framework).with_dependency(Dependency::target("B")),
                Target::new("B", Product::Framework).with_dependency(Dependency::target("A")),
            ],
            Vec::new(),
        );
        let t = GraphTraverser::new(&graph);
        assert!(matches!(
            t.topological_levels(&[r("A")]),
            Err(GraphError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn testable_targets_keep_declaration_order() {
        let graph = layered();
        let t = GraphTraverser::new(&graph);
        assert_eq!(
            t.testable_targets("App", None).unwrap(),
            vec![r("CoreTests"), r("AppUITests")]
        );
        assert_eq!(t.testable_targets("App", Some("Unit")).unwrap(), vec![r("CoreTests")]);
    }

    #[test]
    fn testable_targets_errors() {
        let graph = layered();
        let t = GraphTraverser::new(&graph);
        assert_eq!(
            t.testable_targets("Nope", None).unwrap_err(),
            GraphError::SchemeNotFound("Nope".to_string())
        );
        assert!(matches!(
            t.testable_targets("App", Some("Smoke")),
            Err(GraphError::TestPlanNotFound { .. })
        ));
    }

    #[test]
    fn scheme_without_test_action_is_empty() {
        let graph = graph_of(
            vec![Target::new("A", Product::Framework)],
            vec![Scheme::new("Build")],
        );
        let t = GraphTraverser::new(&graph);
        assert!(t.testable_targets("Build", None).unwrap().is_empty());
    }

    #[test]
    fn scheme_referencing_unknown_target() {
        let graph = graph_of(
            vec![Target::new("A", Product::Framework)],
            vec![Scheme::new("S").with_test_action(TestAction {
                targets: vec![r("Ghost")],
                test_plans: Vec::new(),
            })],
        );
        let t = GraphTraverser::new(&graph);
        assert_eq!(
            t.testable_targets("S", None).unwrap_err(),
            GraphError::UnknownTarget(r("Ghost"))
        );
    }

    #[test]
    fn names_and_all_targets() {
        let graph = layered();
        let t = GraphTraverser::new(&graph);
        assert_eq!(t.all_targets().len(), 5);
        assert!(t.target_names().contains("Feature"));
    }
}
