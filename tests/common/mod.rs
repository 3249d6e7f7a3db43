// Shared fixtures for integration tests
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use futures::future::BoxFuture;
use parking_lot::Mutex;
use smartsports_edge::cache::{CacheStorage, EdgeRequest, MemoryStorage, ResponseSource, StoredResponse};
use smartsports_edge::config::{CacheConfig, UpstreamConfig};
use smartsports_edge::error::{EdgeError, Result};
use smartsports_edge::router::{CacheRouter, Network, Routed};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

pub const ORIGIN: &str = "http://origin.test";

/// Scriptable network: canned responses per URL, an offline switch, a call
/// log, and an optional gate that holds every fetch until released.
#[derive(Default)]
pub struct FakeNetwork {
    offline: AtomicBool,
    responses: Mutex<HashMap<String, StoredResponse>>,
    calls: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, content_type: &str, body: &str) {
        let response = StoredResponse::new(
            status,
            vec![("content-type".to_string(), content_type.to_string())],
            body.to_string(),
        );
        self.responses.lock().insert(absolute(url).to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Hold every subsequent fetch until a permit is added to the returned semaphore.
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn calls_to(&self, url: &str) -> usize {
        let url = absolute(url).to_string();
        self.calls.lock().iter().filter(|c| **c == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Network for FakeNetwork {
    fn fetch<'a>(&'a self, request: &'a EdgeRequest) -> BoxFuture<'a, Result<StoredResponse>> {
        Box::pin(async move {
            self.calls.lock().push(request.url.to_string());

            let gate = self.gate.lock().clone();
            if let Some(gate) = gate {
                let _permit = gate
                    .acquire()
                    .await
                    .map_err(|e| EdgeError::Internal(e.to_string()))?;
            }

            if self.offline.load(Ordering::SeqCst) {
                return Err(EdgeError::Network(format!("{}: connection refused", request.url)));
            }

            Ok(self
                .responses
                .lock()
                .get(request.url.as_str())
                .cloned()
                .unwrap_or_else(|| StoredResponse::new(404, vec![], "not found")))
        })
    }
}

pub fn absolute(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn upstream() -> UpstreamConfig {
    UpstreamConfig {
        origin: ORIGIN.to_string(),
        ..UpstreamConfig::default()
    }
}

pub fn cache_config() -> CacheConfig {
    CacheConfig {
        backend: smartsports_edge::config::StorageBackend::Memory,
        precache: vec![
            "/frontend/".to_string(),
            "/frontend/index.html".to_string(),
            "/frontend/global-styles.css".to_string(),
            "https://cdn.jsdelivr.net/npm/chart.js".to_string(),
        ],
        ..CacheConfig::default()
    }
}

pub fn router(network: Arc<FakeNetwork>) -> (CacheRouter, Arc<MemoryStorage>) {
    router_with(network, &cache_config())
}

pub fn router_with(network: Arc<FakeNetwork>, cache: &CacheConfig) -> (CacheRouter, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let router = CacheRouter::new(cache, &upstream(), storage.clone(), network).unwrap();
    (router, storage)
}

/// Route a request and unwrap the served response.
pub async fn send(router: &CacheRouter, request: EdgeRequest) -> (StoredResponse, ResponseSource) {
    match router.route(request).await {
        Routed::Response { response, source } => (response, source),
        Routed::Bypass(request) => panic!("unexpected bypass for {}", request.url),
    }
}

pub async fn get(router: &CacheRouter, path: &str) -> (StoredResponse, ResponseSource) {
    send(router, EdgeRequest::get(absolute(path))).await
}

pub fn stored(storage: &MemoryStorage, partition: &str, path: &str) -> Option<StoredResponse> {
    storage
        .get(partition, &EdgeRequest::get(absolute(path)).cache_key())
        .unwrap()
}

/// Poll until `condition` holds, yielding to spawned tasks in between.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
