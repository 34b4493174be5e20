//! The project graph and read-only queries over it.
//!
//! A [`Graph`] maps project paths to [`Project`]s, each owning named
//! [`Target`]s connected by [`Dependency`] edges. The graph is built once per
//! invocation, validated with [`Graph::validate`], and then shared immutably.
//! [`GraphTraverser`] answers dependency and test-target questions about it.

#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod traverser;
mod validate;

pub use error::GraphError;
pub use model::{
    Dependency, Graph, Product, Project, Resolved, Scheme, SettingValue, Target, TargetRef,
    TestAction, TestPlan,
};
pub use traverser::GraphTraverser;
