//! Remote cache store over a pluggable transport.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skein_config::RemoteConfig;
use tracing::{debug, warn};

use crate::error::{CacheError, TransportError};
use crate::retry::RetryPolicy;
use crate::store::{CacheCategory, CacheHits, CacheItem, CacheStore, Provenance, StoreSummary};

/// One round trip to a remote cache service.
///
/// Implementations handle a single batch; batching and retries are done by
/// [`RemoteCacheStore`].
pub trait RemoteTransport: Send + Sync {
    /// Returns the subset of `items` present in `category`.
    fn exists(&self, category: CacheCategory, items: &[CacheItem]) -> Result<BTreeSet<CacheItem>, TransportError>;

    /// Records `items` as present in `category`.
    fn put(&self, category: CacheCategory, items: &[CacheItem]) -> Result<(), TransportError>;
}

/// Cache store backed by a remote service.
///
/// Keys are sent in batches of at most `batch_size`, one round trip per
/// batch, each run through the retry policy. A fetch batch that still fails
/// is treated as all misses and noted as a warning on the returned hits; a
/// failed store batch is an error.
pub struct RemoteCacheStore<T> {
    transport: T,
    batch_size: usize,
    retry: RetryPolicy,
}

impl<T: RemoteTransport> RemoteCacheStore<T> {
    /// Creates a store. A `batch_size` of zero is treated as one.
    pub fn new(transport: T, batch_size: usize, retry: RetryPolicy) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
            retry,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: RemoteTransport> CacheStore for RemoteCacheStore<T> {
    fn fetch(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<CacheHits, CacheError> {
        let items: Vec<CacheItem> = items.iter().cloned().collect();
        let mut hits = CacheHits::new();
        for (index, batch) in items.chunks(self.batch_size).enumerate() {
            match self.retry.run("exists", || self.transport.exists(category, batch)) {
                Ok(present) => {
                    // Only keys that were asked for count.
                    for item in batch.iter().filter(|i| present.contains(*i)) {
                        hits.insert(item.clone(), Provenance::Remote);
                    }
                }
                Err(err) => {
                    warn!(
                        category = %category,
                        batch = index,
                        keys = batch.len(),
                        error = %err,
                        "remote cache fetch failed, treating batch as misses"
                    );
                    hits.add_warning(format!(
                        "remote cache lookup for {} {category} keys failed: {err}",
                        batch.len()
                    ));
                }
            }
        }
        debug!(category = %category, requested = items.len(), hits = hits.len(), "remote cache fetch");
        Ok(hits)
    }

    fn store(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<StoreSummary, CacheError> {
        let items: Vec<CacheItem> = items.iter().cloned().collect();
        for batch in items.chunks(self.batch_size) {
            self.retry.run("put", || self.transport.put(category, batch))?;
        }
        Ok(StoreSummary {
            local: 0,
            remote: items.len(),
        })
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<&'a str>,
    items: Vec<WireItem>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash)]
struct WireItem {
    name: String,
    hash: String,
}

#[derive(Deserialize)]
struct ExistsResponse {
    #[serde(default)]
    present: Vec<WireItem>,
}

/// JSON-over-HTTP transport.
///
/// - `POST {url}/api/cache/{category}/exists` with `{"project", "items": [{"name", "hash"}]}`
///   answers `{"present": [{"name", "hash"}]}`
/// - `POST {url}/api/cache/{category}` with the same body stores the items
///
/// Hashes travel as 32-character hex strings. A bearer token is sent when
/// configured.
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    project: Option<String>,
    token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport from `[cache.remote]`, reading the token from
    /// the configured environment variable.
    pub fn new(config: &RemoteConfig) -> Self {
        let token = config.token_env.as_deref().and_then(|var| match std::env::var(var) {
            Ok(token) => Some(token),
            Err(_) => {
                warn!(variable = var, "remote cache token variable is not set");
                None
            }
        });
        Self::with_token(&config.url, config.project.clone(), token, config.timeout())
    }

    /// Creates a transport with an explicit token.
    pub fn with_token(url: &str, project: Option<String>, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::config::Config::builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            base_url: url.trim_end_matches('/').to_string(),
            project,
            token,
        }
    }

    fn post(&self, path: &str, items: &[CacheItem]) -> Result<ureq::http::Response<ureq::Body>, TransportError> {
        let body = WireRequest {
            project: self.project.as_deref(),
            items: items.iter().map(wire_item).collect(),
        };
        let mut request = self
            .agent
            .post(&format!("{}{path}", self.base_url))
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }
        let response = request.send_json(&body).map_err(transport_error)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.into_body().read_to_string().unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        Ok(response)
    }
}

impl RemoteTransport for HttpTransport {
    fn exists(&self, category: CacheCategory, items: &[CacheItem]) -> Result<BTreeSet<CacheItem>, TransportError> {
        let response = self.post(&format!("/api/cache/{category}/exists"), items)?;
        let parsed: ExistsResponse = response
            .into_body()
            .read_json()
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        let requested: HashMap<WireItem, &CacheItem> =
            items.iter().map(|item| (wire_item(item), item)).collect();
        Ok(parsed
            .present
            .into_iter()
            .filter_map(|w| requested.get(&w).map(|item| (*item).clone()))
            .collect())
    }

    fn put(&self, category: CacheCategory, items: &[CacheItem]) -> Result<(), TransportError> {
        self.post(&format!("/api/cache/{category}"), items)?;
        Ok(())
    }
}

fn wire_item(item: &CacheItem) -> WireItem {
    WireItem {
        name: item.name.clone(),
        hash: item.hash.to_hex(),
    }
}

fn transport_error(err: ureq::Error) -> TransportError {
    let message = err.to_string();
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout(message),
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => TransportError::Timeout(message),
        ureq::Error::Io(_) | ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
            TransportError::Connection(message)
        }
        ureq::Error::Json(_) => TransportError::Decode(message),
        _ => TransportError::Request(message),
    }
}
