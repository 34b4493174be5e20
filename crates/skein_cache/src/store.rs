//! Cache keys, fetch results, and the store trait.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use skein_common::ContentHash;

use crate::error::CacheError;

/// Partition of the cache key space.
///
/// The same `(name, hash)` pair means different things in different
/// categories, so categories never share entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheCategory {
    /// Built binaries of a target.
    Binaries,
    /// Test targets whose last run at this hash succeeded.
    SelectiveTests,
}

impl CacheCategory {
    /// Directory and wire name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheCategory::Binaries => "binaries",
            CacheCategory::SelectiveTests => "selective-tests",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cache key within a category: target name plus content hash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheItem {
    /// Target name.
    pub name: String,
    /// Content hash of the target.
    pub hash: ContentHash,
}

impl CacheItem {
    /// Creates a cache item.
    pub fn new(name: impl Into<String>, hash: ContentHash) -> Self {
        Self {
            name: name.into(),
            hash,
        }
    }
}

impl fmt::Display for CacheItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.hash)
    }
}

/// Where a cache lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Found in the local store.
    Local,
    /// Found in the remote store.
    Remote,
    /// Not found.
    Miss,
}

/// Items found by a fetch, with where each was found.
///
/// Items absent from the map are misses. A store that degraded part of a
/// fetch to misses records why in [`warnings`](Self::warnings).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheHits {
    hits: BTreeMap<CacheItem, Provenance>,
    warnings: Vec<String>,
}

impl CacheHits {
    /// An empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hit.
    pub fn insert(&mut self, item: CacheItem, provenance: Provenance) {
        self.hits.insert(item, provenance);
    }

    /// Where `item` was found, or [`Provenance::Miss`].
    pub fn provenance(&self, item: &CacheItem) -> Provenance {
        self.hits.get(item).copied().unwrap_or(Provenance::Miss)
    }

    /// Returns `true` if `item` was found.
    pub fn contains(&self, item: &CacheItem) -> bool {
        self.hits.contains_key(item)
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns `true` if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterates hits in item order.
    pub fn iter(&self) -> btree_map::Iter<'_, CacheItem, Provenance> {
        self.hits.iter()
    }

    /// Records that part of the fetch was degraded to misses.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Degradation messages, in the order they occurred.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Merges another result into this one. Existing entries win.
    pub fn merge(&mut self, other: CacheHits) {
        for (item, provenance) in other.hits {
            self.hits.entry(item).or_insert(provenance);
        }
        self.warnings.extend(other.warnings);
    }

    /// The found items.
    pub fn items(&self) -> BTreeSet<CacheItem> {
        self.hits.keys().cloned().collect()
    }
}

impl FromIterator<(CacheItem, Provenance)> for CacheHits {
    fn from_iter<I: IntoIterator<Item = (CacheItem, Provenance)>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
            warnings: Vec::new(),
        }
    }
}

/// Result of a store call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    /// Entries written locally.
    pub local: usize,
    /// Entries sent to the remote.
    pub remote: usize,
}

/// A content-addressed cache backend.
///
/// An absent key is a normal result, never an error.
pub trait CacheStore: Send + Sync {
    /// Looks up `items` in `category`.
    fn fetch(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<CacheHits, CacheError>;

    /// Records `items` as present in `category`.
    fn store(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<StoreSummary, CacheError>;
}

impl<S: CacheStore + ?Sized> CacheStore for Box<S> {
    fn fetch(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<CacheHits, CacheError> {
        (**self).fetch(category, items)
    }

    fn store(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<StoreSummary, CacheError> {
        (**self).store(category, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> CacheItem {
        CacheItem::new(name, ContentHash::from_bytes(name.as_bytes()))
    }

    #[test]
    fn category_names() {
        assert_eq!(CacheCategory::Binaries.as_str(), "binaries");
        assert_eq!(CacheCategory::SelectiveTests.to_string(), "selective-tests");
        assert_eq!(
            serde_json::to_string(&CacheCategory::SelectiveTests).unwrap(),
            "\"selective-tests\""
        );
    }

    #[test]
    fn absent_item_is_miss() {
        let hits: CacheHits = [(item("A"), Provenance::Local)].into_iter().collect();
        assert_eq!(hits.provenance(&item("A")), Provenance::Local);
        assert_eq!(hits.provenance(&item("B")), Provenance::Miss);
        assert!(!hits.contains(&item("B")));
    }

    #[test]
    fn merge_keeps_existing() {
        let mut hits: CacheHits = [(item("A"), Provenance::Local)].into_iter().collect();
        hits.merge(
            [(item("A"), Provenance::Remote), (item("B"), Provenance::Remote)]
                .into_iter()
                .collect(),
        );
        assert_eq!(hits.provenance(&item("A")), Provenance::Local);
        assert_eq!(hits.provenance(&item("B")), Provenance::Remote);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn merge_carries_warnings() {
        let mut hits = CacheHits::new();
        let mut other = CacheHits::new();
        other.add_warning("batch 1 degraded");
        hits.merge(other);
        assert_eq!(hits.warnings(), ["batch 1 degraded".to_string()]);
        assert!(hits.is_empty());
    }

    #[test]
    fn same_name_different_hash_are_distinct() {
        let a = CacheItem::new("Core", ContentHash::from_bytes(b"1"));
        let b = CacheItem::new("Core", ContentHash::from_bytes(b"2"));
        let hits: CacheHits = [(a.clone(), Provenance::Local)].into_iter().collect();
        assert!(hits.contains(&a));
        assert!(!hits.contains(&b));
    }
}
