//! Deciding which requested targets can be skipped.

use std::collections::BTreeSet;

use skein_cache::{CacheCategory, CacheItem, CacheStore, Provenance};
use skein_common::ContentHash;
use skein_graph::TargetRef;
use skein_hash::{ContentHasher, HashError};
use tracing::{debug, info, warn};

use crate::executor::ExecutionTarget;

/// One requested target and what was decided for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decided {
    /// The target.
    pub target: TargetRef,
    /// Its hash for this run.
    pub hash: ContentHash,
    /// Where its `(name, hash)` was found in the cache.
    pub provenance: Provenance,
    /// Whether it will be skipped.
    pub skipped: bool,
}

impl Decided {
    fn cache_item(&self) -> CacheItem {
        CacheItem::new(self.target.name.clone(), self.hash)
    }
}

/// The skip set for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectiveDecision {
    targets: Vec<Decided>,
    warnings: Vec<String>,
}

impl SelectiveDecision {
    /// Hashes `targets`, asks `store` which `(name, hash)` pairs have passed
    /// before, and skips those.
    ///
    /// A fetch error is logged and treated as no hits. With `ignore_cache`
    /// the lookup still happens, for reporting, but nothing is skipped.
    pub fn decide(
        hasher: &ContentHasher<'_>,
        store: &dyn CacheStore,
        targets: &[TargetRef],
        ignore_cache: bool,
    ) -> Result<Self, HashError> {
        let mut decided = Vec::with_capacity(targets.len());
        for target in targets {
            decided.push(Decided {
                target: target.clone(),
                hash: hasher.hash(target)?,
                provenance: Provenance::Miss,
                skipped: false,
            });
        }

        let mut warnings = Vec::new();
        let items: BTreeSet<CacheItem> = decided.iter().map(Decided::cache_item).collect();
        let hits = if items.is_empty() {
            Default::default()
        } else {
            match store.fetch(CacheCategory::SelectiveTests, &items) {
                Ok(hits) => hits,
                Err(err) => {
                    warn!(error = %err, "cache lookup failed, running every target");
                    warnings.push(format!("cache lookup failed: {err}"));
                    Default::default()
                }
            }
        };
        warnings.extend(hits.warnings().iter().cloned());

        for entry in &mut decided {
            entry.provenance = hits.provenance(&entry.cache_item());
            entry.skipped = !ignore_cache && entry.provenance != Provenance::Miss;
            debug!(target = %entry.target, hash = %entry.hash, provenance = ?entry.provenance, "selective decision");
        }

        let decision = Self {
            targets: decided,
            warnings,
        };
        let skipped = decision.skipped();
        if !skipped.is_empty() {
            let names: Vec<&str> = skipped.iter().map(|t| t.name.as_str()).collect();
            info!(
                "The following targets have not changed since the last successful run and will be skipped: {}",
                names.join(", ")
            );
        } else if ignore_cache {
            debug!("selective testing disabled, running every target");
        }
        Ok(decision)
    }

    /// Every requested target, in request order.
    pub fn targets(&self) -> &[Decided] {
        &self.targets
    }

    /// Targets that will be skipped.
    pub fn skipped(&self) -> Vec<&TargetRef> {
        self.targets.iter().filter(|d| d.skipped).map(|d| &d.target).collect()
    }

    /// Targets the executor has to run, with their hashes.
    pub fn to_run(&self) -> Vec<ExecutionTarget> {
        self.targets
            .iter()
            .filter(|d| !d.skipped)
            .map(|d| ExecutionTarget {
                target: d.target.clone(),
                hash: d.hash,
            })
            .collect()
    }

    /// Warnings from the cache lookup.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Records the executed targets after a successful run.
///
/// Skipped targets are not written again. Returns a warning instead of an
/// error when the store fails: the run itself still succeeded.
pub fn record_success(decision: &SelectiveDecision, store: &dyn CacheStore) -> Option<String> {
    let items: BTreeSet<CacheItem> = decision
        .targets
        .iter()
        .filter(|d| !d.skipped)
        .map(Decided::cache_item)
        .collect();
    if items.is_empty() {
        return None;
    }
    match store.store(CacheCategory::SelectiveTests, &items) {
        Ok(summary) => {
            debug!(local = summary.local, remote = summary.remote, "recorded successful targets");
            None
        }
        Err(err) => {
            warn!(error = %err, "failed to record successful targets");
            Some(format!("failed to record successful targets: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_cache::{CacheError, CacheHits, LocalCacheStore, StoreSummary, TransportError};
    use skein_common::ExecutionContext;
    use skein_graph::{Dependency, Graph, Product, Project, Target};
    use std::fs;
    use std::sync::Mutex;

    struct Fixture {
        dir: tempfile::TempDir,
        graph: Graph,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("App")).unwrap();
            fs::write(dir.path().join("App/Core.swift"), "struct Core {}").unwrap();
            fs::write(dir.path().join("App/CoreTests.swift"), "import Core").unwrap();
            fs::write(dir.path().join("App/AppTests.swift"), "import App").unwrap();
            let project = Project::new("App", "App")
                .with_target(Target::new("Core", Product::Framework).with_sources(["App/Core.swift"]))
                .with_target(Target::new("App", Product::App).with_dependency(Dependency::target("Core")))
                .with_target(
                    Target::new("CoreTests", Product::UnitTests)
                        .with_sources(["App/CoreTests.swift"])
                        .with_dependency(Dependency::target("Core")),
                )
                .with_target(
                    Target::new("AppTests", Product::UnitTests)
                        .with_sources(["App/AppTests.swift"])
                        .with_dependency(Dependency::target("App")),
                );
            Self {
                dir,
                graph: Graph::new([project], Vec::new()).unwrap(),
            }
        }

        fn ctx(&self) -> ExecutionContext {
            ExecutionContext::new(self.dir.path())
        }

        fn requested() -> Vec<TargetRef> {
            vec![TargetRef::new("App", "CoreTests"), TargetRef::new("App", "AppTests")]
        }
    }

    struct FailingStore {
        stored: Mutex<usize>,
    }

    impl CacheStore for FailingStore {
        fn fetch(&self, _: CacheCategory, _: &BTreeSet<CacheItem>) -> Result<CacheHits, CacheError> {
            Err(TransportError::Timeout("10s".into()).into())
        }

        fn store(&self, _: CacheCategory, _: &BTreeSet<CacheItem>) -> Result<StoreSummary, CacheError> {
            *self.stored.lock().unwrap() += 1;
            Err(TransportError::Connection("refused".into()).into())
        }
    }

    /// Answers from a fixed set and records every store call.
    #[derive(Default)]
    struct RecordingStore {
        present: BTreeSet<CacheItem>,
        stored: Mutex<Vec<(CacheCategory, BTreeSet<CacheItem>)>>,
    }

    impl CacheStore for RecordingStore {
        fn fetch(&self, _: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<CacheHits, CacheError> {
            let mut hits = CacheHits::new();
            for item in items.intersection(&self.present) {
                hits.insert(item.clone(), Provenance::Remote);
            }
            Ok(hits)
        }

        fn store(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<StoreSummary, CacheError> {
            self.stored.lock().unwrap().push((category, items.clone()));
            Ok(StoreSummary {
                local: items.len(),
                remote: 0,
            })
        }
    }

    #[test]
    fn only_executed_targets_reach_the_store() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let core_tests = TargetRef::new("App", "CoreTests");
        let app_tests = TargetRef::new("App", "AppTests");
        let h1 = hasher.hash(&core_tests).unwrap();
        let h2 = hasher.hash(&app_tests).unwrap();
        let store = RecordingStore {
            present: BTreeSet::from([CacheItem::new("CoreTests", h1)]),
            ..RecordingStore::default()
        };

        let decision = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        assert_eq!(decision.skipped(), [&core_tests]);
        assert_eq!(decision.targets()[0].provenance, Provenance::Remote);
        let run: Vec<_> = decision.to_run().into_iter().map(|t| (t.target, t.hash)).collect();
        assert_eq!(run, [(app_tests, h2)]);

        assert_eq!(record_success(&decision, &store), None);
        let stored = store.stored.lock().unwrap();
        assert_eq!(
            *stored,
            [(CacheCategory::SelectiveTests, BTreeSet::from([CacheItem::new("AppTests", h2)]))]
        );
    }

    #[test]
    fn cold_cache_runs_everything() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let store = LocalCacheStore::new(fx.dir.path().join("cache"), "test");

        let decision = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        assert!(decision.skipped().is_empty());
        assert_eq!(decision.to_run().len(), 2);
        assert!(decision.warnings().is_empty());
    }

    #[test]
    fn recorded_targets_are_skipped() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let store = LocalCacheStore::new(fx.dir.path().join("cache"), "test");

        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let first = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        assert_eq!(record_success(&first, &store), None);

        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let second = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        assert_eq!(second.skipped().len(), 2);
        assert!(second.to_run().is_empty());
        assert!(second.targets().iter().all(|d| d.provenance == Provenance::Local));
    }

    #[test]
    fn change_below_unskips_dependents_only() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let store = LocalCacheStore::new(fx.dir.path().join("cache"), "test");
        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let first = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        record_success(&first, &store);

        fs::write(fx.dir.path().join("App/AppTests.swift"), "import App\n// more").unwrap();
        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let second = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        let run: Vec<_> = second.to_run().into_iter().map(|t| t.target.name).collect();
        assert_eq!(run, ["AppTests"]);
        assert_eq!(second.skipped(), [&TargetRef::new("App", "CoreTests")]);
    }

    #[test]
    fn ignoring_cache_skips_nothing() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let store = LocalCacheStore::new(fx.dir.path().join("cache"), "test");
        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let first = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        record_success(&first, &store);

        let second = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), true).unwrap();
        assert!(second.skipped().is_empty());
        assert!(second.targets().iter().all(|d| d.provenance == Provenance::Local));
    }

    #[test]
    fn fetch_error_degrades_to_no_hits() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let store = FailingStore { stored: Mutex::new(0) };

        let decision = SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false).unwrap();
        assert_eq!(decision.to_run().len(), 2);
        assert_eq!(decision.warnings().len(), 1);

        let warning = record_success(&decision, &store);
        assert!(warning.unwrap().contains("refused"));
        assert_eq!(*store.stored.lock().unwrap(), 1);
    }

    #[test]
    fn nothing_recorded_when_all_skipped() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let hasher = ContentHasher::new(&fx.graph, &ctx, &[]);
        let store = FailingStore { stored: Mutex::new(0) };
        let decision = SelectiveDecision {
            targets: SelectiveDecision::decide(&hasher, &store, &Fixture::requested(), false)
                .unwrap()
                .targets
                .into_iter()
                .map(|d| Decided { skipped: true, ..d })
                .collect(),
            warnings: Vec::new(),
        };
        assert_eq!(record_success(&decision, &store), None);
        assert_eq!(*store.stored.lock().unwrap(), 0);
    }
}
