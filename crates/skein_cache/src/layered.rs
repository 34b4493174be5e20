//! Local store in front of a remote one.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::CacheError;
use crate::store::{CacheCategory, CacheHits, CacheItem, CacheStore, StoreSummary};

/// Consults `local` first and `remote` only for local misses.
///
/// Remote hits are written through to `local` so the next lookup stays
/// local. A remote fetch error never fails the fetch; it becomes a warning
/// on the returned hits.
pub struct LayeredCacheStore<L, R> {
    local: L,
    remote: R,
}

impl<L: CacheStore, R: CacheStore> LayeredCacheStore<L, R> {
    /// Layers `local` in front of `remote`.
    pub fn new(local: L, remote: R) -> Self {
        Self { local, remote }
    }

    /// The local layer.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// The remote layer.
    pub fn remote(&self) -> &R {
        &self.remote
    }
}

impl<L: CacheStore, R: CacheStore> CacheStore for LayeredCacheStore<L, R> {
    fn fetch(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<CacheHits, CacheError> {
        let mut hits = self.local.fetch(category, items)?;
        let misses: BTreeSet<CacheItem> = items.iter().filter(|i| !hits.contains(i)).cloned().collect();
        if misses.is_empty() {
            return Ok(hits);
        }

        let remote_hits = match self.remote.fetch(category, &misses) {
            Ok(remote_hits) => remote_hits,
            Err(err) => {
                warn!(category = %category, error = %err, "remote cache unavailable, continuing with local results");
                hits.add_warning(format!("remote cache unavailable: {err}"));
                return Ok(hits);
            }
        };

        if !remote_hits.is_empty() {
            if let Err(err) = self.local.store(category, &remote_hits.items()) {
                warn!(category = %category, error = %err, "failed to copy remote hits into local cache");
            }
        }
        debug!(
            category = %category,
            local = hits.len(),
            remote = remote_hits.len(),
            "layered cache fetch"
        );
        hits.merge(remote_hits);
        Ok(hits)
    }

    fn store(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<StoreSummary, CacheError> {
        let local = self.local.store(category, items)?;
        let remote = self.remote.store(category, items)?;
        Ok(StoreSummary {
            local: local.local,
            remote: remote.remote,
        })
    }
}
