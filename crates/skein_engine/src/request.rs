//! What to test.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use skein_graph::{GraphTraverser, Product, TargetRef};

use crate::error::EngineError;

/// A request to test a scheme.
///
/// Filters name targets by their target name. `include`, when non-empty,
/// keeps only the listed targets; `exclude` drops targets after that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestRequest {
    /// Scheme whose test action is run.
    pub scheme: String,
    /// Restricts the run to one of the scheme's test plans.
    pub test_plan: Option<String>,
    /// Only these targets, if non-empty.
    pub include: Vec<String>,
    /// Never these targets.
    pub exclude: Vec<String>,
    /// Extra strings folded into every hash, on top of the configured ones.
    pub additional_strings: Vec<String>,
    /// Drops UI test targets.
    pub skip_ui_tests: bool,
    /// Hashes and reports but skips nothing.
    pub ignore_selective_testing: bool,
}

impl TestRequest {
    /// A request for every test target of `scheme`.
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            ..Self::default()
        }
    }

    /// Scopes the request to a test plan.
    pub fn with_test_plan(mut self, plan: impl Into<String>) -> Self {
        self.test_plan = Some(plan.into());
        self
    }

    /// Adds a target to the include filter.
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.include.push(name.into());
        self
    }

    /// Adds a target to the exclude filter.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }

    /// Adds an extra hash input.
    pub fn with_additional_string(mut self, value: impl Into<String>) -> Self {
        self.additional_strings.push(value.into());
        self
    }

    /// Sets whether UI test targets are dropped.
    pub fn skip_ui_tests(mut self, skip: bool) -> Self {
        self.skip_ui_tests = skip;
        self
    }

    /// Sets whether the cache is ignored when deciding what to run.
    pub fn ignore_selective_testing(mut self, ignore: bool) -> Self {
        self.ignore_selective_testing = ignore;
        self
    }

    /// Resolves the scheme's test targets and applies the filters.
    ///
    /// Filter names are checked against the scheme's targets before UI
    /// tests are dropped, so naming a UI test while skipping UI tests is
    /// not an error.
    pub fn select(&self, traverser: &GraphTraverser<'_>) -> Result<Vec<TargetRef>, EngineError> {
        let candidates = traverser.testable_targets(&self.scheme, self.test_plan.as_deref())?;
        self.check_filters(&candidates)?;

        let include: BTreeSet<&str> = self.include.iter().map(String::as_str).collect();
        let exclude: BTreeSet<&str> = self.exclude.iter().map(String::as_str).collect();
        let mut selected = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self.skip_ui_tests && traverser.target(&candidate)?.product == Product::UiTests {
                continue;
            }
            if !include.is_empty() && !include.contains(candidate.name.as_str()) {
                continue;
            }
            if exclude.contains(candidate.name.as_str()) {
                continue;
            }
            selected.push(candidate);
        }
        Ok(selected)
    }

    fn check_filters(&self, candidates: &[TargetRef]) -> Result<(), EngineError> {
        let include: BTreeSet<&String> = self.include.iter().collect();
        let conflicting: Vec<String> = self
            .exclude
            .iter()
            .filter(|name| include.contains(name))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !conflicting.is_empty() {
            return Err(EngineError::ConflictingFilters { names: conflicting });
        }

        let known: BTreeSet<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        let unknown: BTreeSet<String> = self
            .include
            .iter()
            .chain(&self.exclude)
            .filter(|name| !known.contains(name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(EngineError::UnknownFilterTarget {
                scheme: self.scheme.clone(),
                names: unknown.into_iter().collect(),
            });
        }
        Ok(())
    }
}
