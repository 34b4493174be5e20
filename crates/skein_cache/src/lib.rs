//! Content-addressed cache of verified target hashes.
//!
//! A cache entry is keyed by `(category, target name, hash)` and records
//! only presence. Stores implement [`CacheStore`]:
//!
//! - [`LocalCacheStore`]: entries on the local filesystem
//! - [`RemoteCacheStore`]: batched calls to a remote service through a
//!   [`RemoteTransport`], with bounded retry
//! - [`LayeredCacheStore`]: local first, remote for the rest
//!
//! Reads are fail-safe. A corrupt local entry is a miss, and a remote fetch
//! that keeps failing degrades to "no hits" with a warning.

#![warn(missing_docs)]

pub mod error;
pub mod layered;
pub mod local;
pub mod remote;
pub mod retry;
pub mod store;

pub use error::{CacheError, TransportError};
pub use layered::LayeredCacheStore;
pub use local::LocalCacheStore;
pub use remote::{HttpTransport, RemoteCacheStore, RemoteTransport};
pub use retry::RetryPolicy;
pub use store::{CacheCategory, CacheHits, CacheItem, CacheStore, Provenance, StoreSummary};

use skein_common::ExecutionContext;
use skein_config::CacheConfig;

/// Opens the store described by `config`.
///
/// Without a `[cache.remote]` section this is a plain local store; with one,
/// the local store is layered in front of the remote.
pub fn open_store(
    config: &CacheConfig,
    ctx: &ExecutionContext,
) -> Result<Box<dyn CacheStore>, CacheError> {
    let local = LocalCacheStore::new(ctx.resolve(&config.directory), ctx.tool_version());
    match &config.remote {
        None => Ok(Box::new(local)),
        Some(remote) => {
            let transport = HttpTransport::new(remote);
            let remote = RemoteCacheStore::new(
                transport,
                remote.batch_size,
                RetryPolicy::from_config(&config.retry),
            );
            Ok(Box::new(LayeredCacheStore::new(local, remote)))
        }
    }
}
