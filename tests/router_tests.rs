// Cache-first / network-first routing tests
// Author: kelexine (https://github.com/kelexine)

mod common;

use common::{absolute, eventually, get, router, send, stored, FakeNetwork};
use smartsports_edge::cache::{CacheStorage, EdgeRequest, ResponseSource, StoredResponse};
use smartsports_edge::router::{Routed, OFFLINE_API_ERROR, OFFLINE_TEXT};
use url::Url;

const RUNTIME: &str = "smartsports-runtime-v1.0.0";
const API: &str = "smartsports-api-v1.0.0";

fn body(response: &StoredResponse) -> &str {
    std::str::from_utf8(&response.body).unwrap()
}

// ============================================================================
// Static (cache-first)
// ============================================================================

#[tokio::test]
async fn test_static_miss_is_stored_in_runtime_and_served_offline() {
    let network = FakeNetwork::new();
    network.respond("/frontend/index.html", 200, "text/html", "<h1>home</h1>");
    let (router, storage) = router(network.clone());

    let (first, source) = get(&router, "/frontend/index.html").await;
    assert_eq!(source, ResponseSource::CacheMiss);
    assert_eq!(body(&first), "<h1>home</h1>");

    let entry = stored(&storage, RUNTIME, "/frontend/index.html").expect("stored in runtime");
    assert_eq!(entry.body, first.body);

    network.set_offline(true);
    let (second, source) = get(&router, "/frontend/index.html").await;
    assert_eq!(source, ResponseSource::CacheHit);
    assert_eq!(second.status, 200);
    assert_eq!(second.body, first.body);
}

#[tokio::test]
async fn test_cache_hit_returns_without_waiting_and_refreshes_once() {
    let network = FakeNetwork::new();
    network.respond("/frontend/app.js", 200, "text/javascript", "v1");
    let (router, storage) = router(network.clone());
    get(&router, "/frontend/app.js").await;
    assert_eq!(network.calls_to("/frontend/app.js"), 1);

    // From here on every fetch blocks until released
    let gate = network.hold();
    network.respond("/frontend/app.js", 200, "text/javascript", "v2");

    let (hit, source) = get(&router, "/frontend/app.js").await;
    assert_eq!(source, ResponseSource::CacheHit);
    assert_eq!(body(&hit), "v1");

    eventually(|| network.calls_to("/frontend/app.js") == 2).await;
    assert_eq!(
        body(&stored(&storage, RUNTIME, "/frontend/app.js").unwrap()),
        "v1"
    );

    gate.add_permits(1);
    eventually(|| {
        stored(&storage, RUNTIME, "/frontend/app.js")
            .map(|r| r.body == "v2")
            .unwrap_or(false)
    })
    .await;
    assert_eq!(network.calls_to("/frontend/app.js"), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_cached_copy() {
    let network = FakeNetwork::new();
    network.respond("/frontend/stats.html", 200, "text/html", "stats");
    let (router, storage) = router(network.clone());
    get(&router, "/frontend/stats.html").await;

    network.respond("/frontend/stats.html", 500, "text/html", "broken");
    let handle = router.spawn_revalidate(EdgeRequest::get(absolute("/frontend/stats.html")));
    handle.await.unwrap();
    assert_eq!(body(&stored(&storage, RUNTIME, "/frontend/stats.html").unwrap()), "stats");

    network.set_offline(true);
    let handle = router.spawn_revalidate(EdgeRequest::get(absolute("/frontend/stats.html")));
    handle.await.unwrap();
    assert_eq!(body(&stored(&storage, RUNTIME, "/frontend/stats.html").unwrap()), "stats");
}

#[tokio::test]
async fn test_precached_entry_is_served_from_static_partition() {
    let network = FakeNetwork::new();
    let (router, storage) = router(network.clone());
    let key = EdgeRequest::get(absolute("/frontend/global-styles.css")).cache_key();
    storage
        .put(
            "smartsports-v1.0.0",
            &key,
            &StoredResponse::new(200, vec![], "body{}"),
        )
        .unwrap();
    network.set_offline(true);

    let (response, source) = get(&router, "/frontend/global-styles.css").await;
    assert_eq!(source, ResponseSource::CacheHit);
    assert_eq!(body(&response), "body{}");
}

#[tokio::test]
async fn test_static_offline_without_cache_is_text_503() {
    let network = FakeNetwork::new();
    network.set_offline(true);
    let (router, _storage) = router(network);

    let (response, source) = get(&router, "/frontend/unknown.html").await;
    assert_eq!(source, ResponseSource::Offline);
    assert_eq!(response.status, 503);
    assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(body(&response), OFFLINE_TEXT);
}

#[tokio::test]
async fn test_static_offline_serves_cached_offline_page() {
    let network = FakeNetwork::new();
    network.respond("/frontend/offline.html", 200, "text/html", "offline page");
    let (router, _storage) = router(network.clone());
    get(&router, "/frontend/offline.html").await;

    network.set_offline(true);
    let (response, source) = get(&router, "/frontend/never-seen.html").await;
    assert_eq!(source, ResponseSource::Fallback);
    assert_eq!(body(&response), "offline page");
}

#[tokio::test]
async fn test_static_error_status_passes_through_uncached() {
    let network = FakeNetwork::new();
    let (router, storage) = router(network.clone());

    let (response, source) = get(&router, "/frontend/missing.html").await;
    assert_eq!(source, ResponseSource::CacheMiss);
    assert_eq!(response.status, 404);
    assert!(stored(&storage, RUNTIME, "/frontend/missing.html").is_none());
}

#[tokio::test]
async fn test_post_to_static_path_is_never_cached() {
    let network = FakeNetwork::new();
    network.respond("/frontend/form", 200, "text/html", "ok");
    let (router, storage) = router(network.clone());

    let mut request = EdgeRequest::get(absolute("/frontend/form"));
    request.method = "POST".to_string();
    send(&router, request.clone()).await;
    send(&router, request).await;

    assert_eq!(network.calls_to("/frontend/form"), 2);
    assert_eq!(storage.entry_count(RUNTIME).unwrap(), 0);
}

// ============================================================================
// API (network-first)
// ============================================================================

#[tokio::test]
async fn test_api_success_is_returned_and_stored() {
    let network = FakeNetwork::new();
    network.respond("/api/predictions/latest", 200, "application/json", r#"{"n":1}"#);
    let (router, storage) = router(network.clone());

    let (response, source) = get(&router, "/api/predictions/latest").await;
    assert_eq!(source, ResponseSource::Network);
    assert_eq!(body(&response), r#"{"n":1}"#);
    assert_eq!(stored(&storage, API, "/api/predictions/latest").unwrap().body, response.body);

    network.respond("/api/predictions/latest", 200, "application/json", r#"{"n":2}"#);
    let (response, _) = get(&router, "/api/predictions/latest").await;
    assert_eq!(body(&response), r#"{"n":2}"#);
    assert_eq!(
        body(&stored(&storage, API, "/api/predictions/latest").unwrap()),
        r#"{"n":2}"#
    );
}

#[tokio::test]
async fn test_api_offline_serves_last_stored_response() {
    let network = FakeNetwork::new();
    network.respond("/api/predictions/latest", 200, "application/json", r#"{"n":1}"#);
    let (router, _storage) = router(network.clone());
    let (online, _) = get(&router, "/api/predictions/latest").await;

    network.set_offline(true);
    let (offline, source) = get(&router, "/api/predictions/latest").await;
    assert_eq!(source, ResponseSource::Fallback);
    assert_eq!(offline.status, 200);
    assert_eq!(offline.body, online.body);
}

#[tokio::test]
async fn test_api_offline_without_cache_is_json_503() {
    let network = FakeNetwork::new();
    network.set_offline(true);
    let (router, _storage) = router(network);

    let (response, source) = get(&router, "/api/live/scores").await;
    assert_eq!(source, ResponseSource::Offline);
    assert_eq!(response.status, 503);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(json["error"], OFFLINE_API_ERROR);
}

#[tokio::test]
async fn test_api_error_status_is_returned_as_is() {
    let network = FakeNetwork::new();
    network.respond("/api/live/scores", 200, "application/json", "[1]");
    let (router, storage) = router(network.clone());
    get(&router, "/api/live/scores").await;

    network.respond("/api/live/scores", 500, "application/json", r#"{"error":"upstream"}"#);
    let (response, source) = get(&router, "/api/live/scores").await;
    assert_eq!(source, ResponseSource::Network);
    assert_eq!(response.status, 500);
    assert_eq!(body(&stored(&storage, API, "/api/live/scores").unwrap()), "[1]");
}

#[tokio::test]
async fn test_api_host_marker_routes_network_first() {
    let network = FakeNetwork::new();
    let url = Url::parse("https://v3.football.api-sports.io/fixtures?live=all").unwrap();
    network.set_offline(true);
    let (router, _storage) = router(network.clone());

    let (response, source) = send(&router, EdgeRequest::get(url)).await;
    assert_eq!(source, ResponseSource::Offline);
    assert_eq!(response.header("content-type"), Some("application/json"));
}

// ============================================================================
// Bypass and upgrade
// ============================================================================

#[tokio::test]
async fn test_non_http_requests_bypass() {
    let network = FakeNetwork::new();
    let (router, _storage) = router(network.clone());
    let url = Url::parse("chrome-extension://abcdef/script.js").unwrap();

    match router.route(EdgeRequest::get(url)).await {
        Routed::Bypass(request) => assert_eq!(request.url.scheme(), "chrome-extension"),
        Routed::Response { .. } => panic!("expected bypass"),
    }
    assert_eq!(network.total_calls(), 0);
}

#[tokio::test]
async fn test_purge_removes_only_other_versions() {
    let network = FakeNetwork::new();
    let (router, storage) = router(network);
    for name in [
        "smartsports-v0.9.0",
        "smartsports-runtime-v0.9.0",
        "smartsports-api-v0.9.0",
        "smartsports-v1.0.0",
        RUNTIME,
        API,
    ] {
        storage.open_partition(name).unwrap();
    }

    let mut removed = router.purge_stale_partitions().unwrap();
    removed.sort();
    assert_eq!(
        removed,
        vec![
            "smartsports-api-v0.9.0".to_string(),
            "smartsports-runtime-v0.9.0".to_string(),
            "smartsports-v0.9.0".to_string(),
        ]
    );
    assert_eq!(
        storage.partitions().unwrap(),
        vec![API.to_string(), RUNTIME.to_string(), "smartsports-v1.0.0".to_string()]
    );
}
