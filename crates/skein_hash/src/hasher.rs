//! Memoized, level-parallel target hashing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use skein_common::{ContentHash, DigestBuilder, ExecutionContext, InternalError, SkeinResult};
use skein_graph::{Graph, GraphTraverser, Target, TargetRef};
use tracing::debug;

use crate::error::HashError;
use crate::settings::settings_digest;

/// Computes deterministic hashes for targets of one graph.
///
/// A hasher lives for one invocation. Each target is computed at most once:
/// the memo maps every target to a [`OnceCell`], and concurrent callers
/// asking for the same target converge on the same cell.
///
/// The hash of a target is the digest of
/// 1. its *leaf* digest: sorted `(relative path, content digest)` pairs of
///    all sources and headers, the product kind, the module name when one
///    is set, the settings digest, and the sorted, de-duplicated additional
///    strings;
/// 2. the sorted list of its direct dependencies' hex hashes together with
///    the locators of its terminal leaves.
///
/// The target's name is not hashed. Callers pair it with the hash to form a
/// cache key.
pub struct ContentHasher<'g> {
    graph: &'g Graph,
    ctx: &'g ExecutionContext,
    additional_strings: Vec<String>,
    memo: DashMap<TargetRef, Arc<OnceCell<ContentHash>>>,
    computed: AtomicUsize,
}

impl<'g> ContentHasher<'g> {
    /// Creates a hasher over a validated graph.
    ///
    /// `additional_strings` are folded into every target's hash; their
    /// order and duplicates do not matter.
    pub fn new(graph: &'g Graph, ctx: &'g ExecutionContext, additional_strings: &[String]) -> Self {
        let mut additional_strings = additional_strings.to_vec();
        additional_strings.sort();
        additional_strings.dedup();
        Self {
            graph,
            ctx,
            additional_strings,
            memo: DashMap::new(),
            computed: AtomicUsize::new(0),
        }
    }

    /// Number of targets whose hash has actually been computed.
    pub fn computed_count(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }

    /// Returns the memoized hash of `target`, if it has been computed.
    pub fn memoized(&self, target: &TargetRef) -> Option<ContentHash> {
        self.memo.get(target).and_then(|cell| cell.get().copied())
    }

    /// Hashes one target and, as needed, its dependency closure.
    pub fn hash(&self, target: &TargetRef) -> Result<ContentHash, HashError> {
        if let Some(hash) = self.memoized(target) {
            return Ok(hash);
        }
        let hashes = self.hash_all(std::slice::from_ref(target))?;
        hashes
            .get(target)
            .copied()
            .ok_or_else(|| HashError::from(InternalError::new(format!("no hash produced for {target}"))))
    }

    /// Hashes several targets together.
    ///
    /// The union of their closures is split into topological levels; each
    /// level is hashed in parallel and only reads memoized results of lower
    /// levels.
    pub fn hash_all(&self, targets: &[TargetRef]) -> Result<BTreeMap<TargetRef, ContentHash>, HashError> {
        let levels = GraphTraverser::new(self.graph).topological_levels(targets)?;
        for level in &levels {
            level.par_iter().try_for_each(|t| self.compute(t).map(|_| ()))?;
        }
        targets
            .iter()
            .map(|t| {
                self.memoized(t)
                    .map(|h| (t.clone(), h))
                    .ok_or_else(|| HashError::from(InternalError::new(format!("memo entry missing for {t}"))))
            })
            .collect()
    }

    fn compute(&self, target: &TargetRef) -> Result<ContentHash, HashError> {
        // Clone the cell out so no map shard lock is held during init.
        let cell = self
            .memo
            .entry(target.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        // The initializer must not block on rayon work: a worker waiting on
        // this cell could otherwise steal a task that waits on it too.
        cell.get_or_try_init(|| self.compute_uncached(target))
            .copied()
    }

    fn compute_uncached(&self, target_ref: &TargetRef) -> Result<ContentHash, HashError> {
        let traverser = GraphTraverser::new(self.graph);
        let target = traverser.target(target_ref)?;
        let leaf = self.leaf_digest(target_ref, target)?;

        let mut inputs: Vec<String> = traverser.direct_leaves(target_ref)?.into_iter().collect();
        for dep in traverser.direct_dependencies(target_ref)? {
            inputs.push(self.dependency_hash(target_ref, &dep)?.to_hex());
        }
        inputs.sort();

        let mut digest = DigestBuilder::new();
        digest.hash(&leaf).bytes(&(inputs.len() as u64).to_le_bytes());
        for input in &inputs {
            digest.str(input);
        }
        let hash = digest.finish();

        self.computed.fetch_add(1, Ordering::Relaxed);
        debug!(target = %target_ref, hash = %hash, "hashed target");
        Ok(hash)
    }

    /// Level ordering guarantees dependencies are memoized first.
    fn dependency_hash(&self, from: &TargetRef, dep: &TargetRef) -> SkeinResult<ContentHash> {
        self.memoized(dep)
            .ok_or_else(|| InternalError::new(format!("{from} hashed before its dependency {dep}")))
    }

    fn leaf_digest(&self, target_ref: &TargetRef, target: &Target) -> Result<ContentHash, HashError> {
        let mut files = Vec::with_capacity(target.sources.len() + target.headers.len());
        for declared in target.files() {
            let path = self.ctx.resolve(declared);
            let content = std::fs::read(&path).map_err(|source| HashError::Unreadable {
                target: target_ref.clone(),
                path: path.clone(),
                source,
            })?;
            files.push((self.ctx.relativize(&path), ContentHash::from_bytes(&content)));
        }
        files.sort();
        files.dedup();

        let mut digest = DigestBuilder::new();
        digest.bytes(&(files.len() as u64).to_le_bytes());
        for (path, content) in &files {
            digest.str(path).hash(content);
        }
        digest.str(target.product.as_str());
        match &target.product_name {
            Some(module) => digest.bytes(&[1]).str(module),
            None => digest.bytes(&[0]),
        };
        digest
            .hash(&settings_digest(&target.settings))
            .bytes(&(self.additional_strings.len() as u64).to_le_bytes());
        for s in &self.additional_strings {
            digest.str(s);
        }
        Ok(digest.finish())
    }
}
