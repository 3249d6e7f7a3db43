//! Cache-first and network-first request routing.
//!
//! The [`CacheRouter`] decides, for each request, whether to answer from a
//! cache partition or from the network, and writes successful network
//! responses through to the matching partition:
//!
//! - static requests: cache-first, refreshed in the background on a hit
//!   (stale-while-revalidate), stored in the runtime partition on a miss;
//! - API requests: network-first, stored in the api partition, falling back
//!   to the last stored response when the network is unreachable.
//!
//! A network failure is never retried. The router always produces a response:
//! a stored one, the offline page, or a synthesized 503.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::classify::{Classifier, RequestClass};
use super::network::Network;
use crate::cache::{CacheKey, CacheStorage, EdgeRequest, ResponseSource, StoredResponse};
use crate::config::{CacheConfig, UpstreamConfig};
use crate::error::{EdgeError, Result};
use crate::metrics;
use crate::utils::logging::sanitize_url;
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Body of the synthesized plain-text response for static requests.
pub const OFFLINE_TEXT: &str = "אתה במצב אופליין. אנא בדוק את החיבור לאינטרנט.";

/// Message carried in the `error` field of the synthesized API response.
pub const OFFLINE_API_ERROR: &str = "אופליין - לא ניתן לטעון נתונים";

/// Names of the three partitions belonging to the running version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    pub static_assets: String,
    pub runtime: String,
    pub api: String,
}

impl PartitionSet {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            static_assets: config.static_partition(),
            runtime: config.runtime_partition(),
            api: config.api_partition(),
        }
    }

    pub fn names(&self) -> [&str; 3] {
        [self.static_assets.as_str(), self.runtime.as_str(), self.api.as_str()]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    /// Read order for cache-first lookups. Runtime comes first so that a
    /// revalidated copy shadows the install-time one.
    fn asset_lookup_order(&self) -> Vec<String> {
        vec![self.runtime.clone(), self.static_assets.clone(), self.api.clone()]
    }

    fn api_lookup_order(&self) -> Vec<String> {
        vec![self.api.clone(), self.runtime.clone(), self.static_assets.clone()]
    }
}

/// Outcome of routing one request.
#[derive(Debug)]
pub enum Routed {
    /// The request is not ours to handle; the host forwards it as is.
    Bypass(EdgeRequest),
    Response {
        response: StoredResponse,
        source: ResponseSource,
    },
}

impl Routed {
    fn served(response: StoredResponse, source: ResponseSource) -> Self {
        Routed::Response { response, source }
    }
}

/// The caching request router.
///
/// Cheap to clone; clones share storage and network.
#[derive(Clone)]
pub struct CacheRouter {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    classifier: Classifier,
    partitions: PartitionSet,
    origin: Url,
    offline_page: String,
}

impl CacheRouter {
    pub fn new(
        cache: &CacheConfig,
        upstream: &UpstreamConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Result<Self> {
        let origin = Url::parse(&upstream.origin)
            .map_err(|e| EdgeError::Config(format!("Invalid upstream origin {}: {}", upstream.origin, e)))?;

        Ok(Self {
            storage,
            network,
            classifier: Classifier::from_config(cache),
            partitions: PartitionSet::from_config(cache),
            origin,
            offline_page: cache.offline_page.clone(),
        })
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve a manifest entry or request target against the upstream origin.
    /// Absolute URLs are returned unchanged.
    pub fn resolve(&self, raw: &str) -> Result<Url> {
        Ok(self.origin.join(raw)?)
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        self.classifier.classify(url)
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Seed the static partition from the precache manifest.
    ///
    /// Every entry is fetched (bypassing HTTP caches) before anything is
    /// written, so one failed entry leaves the partition untouched. Returns the
    /// number of entries stored.
    pub async fn install(&self, manifest: &[String]) -> Result<usize> {
        info!(
            "Precaching {} assets into {}",
            manifest.len(),
            self.partitions.static_assets
        );

        let fetched = try_join_all(manifest.iter().map(|raw| self.fetch_for_precache(raw))).await?;

        self.storage.open_partition(&self.partitions.static_assets)?;
        for (key, response) in &fetched {
            self.storage
                .put(&self.partitions.static_assets, key, response)?;
        }

        metrics::record_cache_write(&self.partitions.static_assets, fetched.len());
        Ok(fetched.len())
    }

    async fn fetch_for_precache(&self, raw: &str) -> Result<(CacheKey, StoredResponse)> {
        let url = self.resolve(raw).map_err(|e| EdgeError::SeedFailed {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        let mut request = EdgeRequest::get(url);
        request
            .headers
            .push(("cache-control".to_string(), "no-cache".to_string()));

        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| EdgeError::SeedFailed {
                url: sanitize_url(raw),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(EdgeError::SeedFailed {
                url: sanitize_url(raw),
                reason: format!("HTTP {}", response.status),
            });
        }

        Ok((request.cache_key(), response))
    }

    /// Delete every partition that does not belong to the running version.
    /// Returns the names removed.
    pub fn purge_stale_partitions(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for name in self.storage.partitions()? {
            if self.partitions.is_current(&name) {
                continue;
            }
            info!("Deleting old cache partition: {}", name);
            if self.storage.delete_partition(&name)? {
                removed.push(name);
            }
        }
        metrics::record_partitions_purged("upgrade", removed.len());
        Ok(removed)
    }

    /// Delete every partition, current ones included.
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.storage.clear()?;
        info!("Cleared {} cache partitions", removed);
        metrics::record_partitions_purged("clear", removed);
        Ok(removed)
    }

    // ========================================================================
    // ROUTING
    // ========================================================================

    /// Route one intercepted request.
    pub async fn route(&self, request: EdgeRequest) -> Routed {
        let class = self.classify(&request.url);
        debug!(
            "{} {} classified as {:?}",
            request.method,
            sanitize_url(request.url.as_str()),
            class
        );

        let routed = match class {
            RequestClass::Bypass => return Routed::Bypass(request),
            RequestClass::Api => self.network_first(request).await,
            RequestClass::Static => self.cache_first(request).await,
        };

        if let Routed::Response { source, .. } = &routed {
            metrics::record_route(class.strategy(), source.as_str());
        }
        routed
    }

    /// Serve from any partition; on a miss fetch and store in runtime.
    pub async fn cache_first(&self, request: EdgeRequest) -> Routed {
        let key = request.cache_key();

        if request.is_cacheable() {
            match self
                .storage
                .match_any(&key, &self.partitions.asset_lookup_order())
            {
                Ok(Some(cached)) => {
                    self.spawn_revalidate(request);
                    return Routed::served(cached, ResponseSource::CacheHit);
                }
                Ok(None) => {}
                Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
            }
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if response.is_success() && request.is_cacheable() {
                    self.store(&self.partitions.runtime, &key, &response);
                }
                Routed::served(response, ResponseSource::CacheMiss)
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", sanitize_url(request.url.as_str()), e);
                self.offline_asset_response()
            }
        }
    }

    /// Fetch first and store in api; on failure serve the last stored copy.
    pub async fn network_first(&self, request: EdgeRequest) -> Routed {
        let key = request.cache_key();

        match self.network.fetch(&request).await {
            Ok(response) => {
                if response.is_success() && request.is_cacheable() {
                    self.store(&self.partitions.api, &key, &response);
                }
                Routed::served(response, ResponseSource::Network)
            }
            Err(e) => {
                warn!(
                    "API fetch failed for {}, trying cache: {}",
                    sanitize_url(request.url.as_str()),
                    e
                );

                if request.is_cacheable() {
                    match self
                        .storage
                        .match_any(&key, &self.partitions.api_lookup_order())
                    {
                        Ok(Some(cached)) => return Routed::served(cached, ResponseSource::Fallback),
                        Ok(None) => {}
                        Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
                    }
                }

                Routed::served(offline_json(), ResponseSource::Offline)
            }
        }
    }

    /// Refresh a cached entry without making the caller wait.
    ///
    /// The task result is never observed by the request that triggered it;
    /// failures are logged and counted.
    pub fn spawn_revalidate(&self, request: EdgeRequest) -> JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            if let Err(e) = router.revalidate(&request).await {
                warn!(
                    "Background refresh failed for {}: {}",
                    sanitize_url(request.url.as_str()),
                    e
                );
                metrics::record_background_failure("revalidate");
            }
        })
    }

    async fn revalidate(&self, request: &EdgeRequest) -> Result<()> {
        let response = self.network.fetch(request).await?;
        if !response.is_success() {
            debug!(
                "Background refresh for {} got HTTP {}, keeping cached copy",
                sanitize_url(request.url.as_str()),
                response.status
            );
            return Ok(());
        }

        self.storage
            .put(&self.partitions.runtime, &request.cache_key(), &response)?;
        metrics::record_cache_write(&self.partitions.runtime, 1);
        Ok(())
    }

    fn store(&self, partition: &str, key: &CacheKey, response: &StoredResponse) {
        match self.storage.put(partition, key, response) {
            Ok(()) => metrics::record_cache_write(partition, 1),
            Err(e) => {
                warn!("Failed to store {} in {}: {}", key, partition, e);
                metrics::record_cache_write_error(partition);
            }
        }
    }

    fn offline_asset_response(&self) -> Routed {
        let page = self
            .resolve(&self.offline_page)
            .ok()
            .map(|url| CacheKey::new("GET", &url))
            .and_then(|key| {
                self.storage
                    .match_any(&key, &self.partitions.asset_lookup_order())
                    .unwrap_or_else(|e| {
                        warn!("Offline page lookup failed: {}", e);
                        None
                    })
            });

        match page {
            Some(page) => Routed::served(page, ResponseSource::Fallback),
            None => Routed::served(offline_text(), ResponseSource::Offline),
        }
    }
}

/// Synthesized response for static requests with no network and no cache.
pub fn offline_text() -> StoredResponse {
    StoredResponse::new(
        503,
        vec![(
            "content-type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        )],
        OFFLINE_TEXT,
    )
}

/// Synthesized response for API requests with no network and no cache.
pub fn offline_json() -> StoredResponse {
    let body = serde_json::json!({ "error": OFFLINE_API_ERROR }).to_string();
    StoredResponse::new(
        503,
        vec![("content-type".to_string(), "application/json".to_string())],
        body,
    )
}
