//! All built-in lint rule implementations.

mod w101;
mod w102;

pub use w101::ImplicitDependency;
pub use w102::RedundantDependency;

use crate::LintEngine;

/// Registers all built-in lint rules with the engine.
pub fn register_builtin_rules(engine: &mut LintEngine) {
    engine.register(Box::new(ImplicitDependency));
    engine.register(Box::new(RedundantDependency));
}
