//! Selective test execution over the project graph.
//!
//! [`Engine::run`] validates the graph, resolves the requested test targets,
//! lints and hashes in parallel, skips every target whose `(name, hash)` is
//! already recorded in the cache, hands the rest to a [`TestExecutor`], and
//! records the executed targets after a successful run.

#![warn(missing_docs)]

pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod request;
pub mod selective;

pub use error::EngineError;
pub use executor::{ExecutionOutcome, ExecutionTarget, TestExecutor};
pub use pipeline::Engine;
pub use report::{RunReport, TargetReport};
pub use request::TestRequest;
pub use selective::{record_success, Decided, SelectiveDecision};
