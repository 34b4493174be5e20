//! Error types for graph construction, validation, and traversal.

use std::path::PathBuf;

use crate::model::TargetRef;

/// Errors raised while building or querying the project graph.
///
/// All of these are configuration errors detected before any hashing or
/// cache interaction; the pipeline aborts on them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A dependency edge names a target that is not in the graph.
    #[error("target '{from}' depends on '{missing}', which does not exist in the graph")]
    TargetNotFound {
        /// The target declaring the edge.
        from: TargetRef,
        /// The unresolved referent.
        missing: TargetRef,
    },

    /// A cross-project edge names a project that is not in the graph.
    #[error("target '{from}' depends on project '{}', which is not part of the graph", path.display())]
    ProjectNotFound {
        /// The target declaring the edge.
        from: TargetRef,
        /// The unresolved project path.
        path: PathBuf,
    },

    /// The dependency edges form a cycle.
    #[error("dependency cycle detected: {}", format_cycle(members))]
    DependencyCycle {
        /// The targets on the cycle, in traversal order.
        members: Vec<TargetRef>,
    },

    /// A queried or scheme-referenced target does not exist.
    #[error("unknown target '{0}'")]
    UnknownTarget(TargetRef),

    /// No scheme with the given name exists.
    #[error("scheme '{0}' not found")]
    SchemeNotFound(String),

    /// The scheme has no test plan with the given name.
    #[error("test plan '{plan}' not found in scheme '{scheme}'")]
    TestPlanNotFound {
        /// The scheme searched.
        scheme: String,
        /// The missing plan.
        plan: String,
    },

    /// Two targets with the same name were declared in one project.
    #[error("project '{}' declares target '{name}' more than once", project.display())]
    DuplicateTarget {
        /// The project path.
        project: PathBuf,
        /// The duplicated target name.
        name: String,
    },

    /// Two projects share one path.
    #[error("project '{}' is declared more than once", .0.display())]
    DuplicateProject(PathBuf),

    /// The serialized graph could not be decoded.
    #[error("failed to decode graph: {0}")]
    Decode(String),
}

fn format_cycle(members: &[TargetRef]) -> String {
    let mut names: Vec<String> = members.iter().map(|m| m.to_string()).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" -> ")
}
