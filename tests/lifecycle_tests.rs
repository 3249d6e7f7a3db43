// Install / activate lifecycle tests
// Author: kelexine (https://github.com/kelexine)

mod common;

use common::{cache_config, router_with, stored, FakeNetwork};
use smartsports_edge::cache::{CacheStorage, EdgeRequest, MemoryStorage};
use smartsports_edge::config::CacheConfig;
use smartsports_edge::worker::{
    ClientRegistry, ControlMessage, InstallOutcome, Lifecycle, PageMessage, WorkerState,
};
use std::sync::Arc;

const STATIC: &str = "smartsports-v1.0.0";

fn serve_manifest(network: &FakeNetwork, config: &CacheConfig) {
    for url in &config.precache {
        network.respond(url, 200, "text/plain", &format!("asset {}", url));
    }
}

fn lifecycle(network: Arc<FakeNetwork>, config: &CacheConfig) -> (Lifecycle, Arc<MemoryStorage>, ClientRegistry) {
    let (router, storage) = router_with(network, config);
    let clients = ClientRegistry::new();
    let lifecycle = Lifecycle::new(router, clients.clone(), config);
    (lifecycle, storage, clients)
}

#[tokio::test]
async fn test_install_seeds_static_partition_and_activates() {
    let config = cache_config();
    let network = FakeNetwork::new();
    serve_manifest(&network, &config);
    let (lifecycle, storage, _clients) = lifecycle(network.clone(), &config);
    assert!(!lifecycle.is_controlling());

    let outcome = lifecycle.install().await.unwrap();
    assert_eq!(
        outcome,
        InstallOutcome::Seeded {
            entries: config.precache.len()
        }
    );
    assert_eq!(storage.entry_count(STATIC).unwrap(), config.precache.len());
    assert!(stored(&storage, STATIC, "https://cdn.jsdelivr.net/npm/chart.js").is_some());
    assert_eq!(lifecycle.state(), WorkerState::Activated);
    assert!(lifecycle.is_controlling());
}

#[tokio::test]
async fn test_install_is_all_or_nothing() {
    let config = cache_config();
    let network = FakeNetwork::new();
    serve_manifest(&network, &config);
    network.respond("/frontend/global-styles.css", 404, "text/plain", "gone");
    let (lifecycle, storage, _clients) = lifecycle(network, &config);

    match lifecycle.install().await.unwrap() {
        InstallOutcome::SeedFailed { reason } => {
            assert!(reason.contains("/frontend/global-styles.css"));
            assert!(reason.contains("404"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(storage.entry_count(STATIC).unwrap(), 0);
}

#[tokio::test]
async fn test_failed_seed_still_activates_and_routes_through_cache() {
    let config = cache_config();
    let network = FakeNetwork::new();
    serve_manifest(&network, &config);
    network.respond("https://cdn.jsdelivr.net/npm/chart.js", 503, "text/plain", "down");
    network.respond("/api/live/scores", 200, "application/json", "[1]");
    let (lifecycle, storage, _clients) = lifecycle(network.clone(), &config);

    let outcome = lifecycle.install().await.unwrap();
    assert!(matches!(outcome, InstallOutcome::SeedFailed { .. }));
    assert_eq!(lifecycle.state(), WorkerState::Activated);
    assert!(lifecycle.is_controlling());

    // API responses keep being stored for offline use
    let router = smartsports_edge::router::CacheRouter::new(
        &config,
        &common::upstream(),
        storage.clone(),
        network,
    )
    .unwrap();
    router
        .route(EdgeRequest::get(common::absolute("/api/live/scores")))
        .await;
    assert!(stored(&storage, "smartsports-api-v1.0.0", "/api/live/scores").is_some());
}

#[tokio::test]
async fn test_install_offline_keeps_existing_partitions() {
    let config = cache_config();
    let network = FakeNetwork::new();
    network.set_offline(true);
    let (lifecycle, storage, _clients) = lifecycle(network, &config);
    storage.open_partition("smartsports-runtime-v1.0.0").unwrap();

    let outcome = lifecycle.install().await.unwrap();
    assert!(matches!(outcome, InstallOutcome::SeedFailed { .. }));
    assert_eq!(
        storage.partitions().unwrap(),
        vec!["smartsports-runtime-v1.0.0".to_string()]
    );
    assert_eq!(lifecycle.state(), WorkerState::Activated);
}

#[tokio::test]
async fn test_install_twice_is_rejected() {
    let config = cache_config();
    let network = FakeNetwork::new();
    serve_manifest(&network, &config);
    let (lifecycle, _storage, _clients) = lifecycle(network, &config);

    lifecycle.install().await.unwrap();
    assert!(lifecycle.install().await.is_err());
    assert_eq!(lifecycle.state(), WorkerState::Activated);
}

#[tokio::test]
async fn test_waiting_worker_activates_on_skip_waiting() {
    let config = CacheConfig {
        skip_waiting_on_install: false,
        ..cache_config()
    };
    let network = FakeNetwork::new();
    serve_manifest(&network, &config);
    let (lifecycle, _storage, _clients) = lifecycle(network, &config);

    lifecycle.install().await.unwrap();
    assert_eq!(lifecycle.state(), WorkerState::Installed);
    assert!(!lifecycle.is_controlling());

    lifecycle.handle_message(ControlMessage::SkipWaiting).unwrap();
    assert_eq!(lifecycle.state(), WorkerState::Activated);

    // Nothing waiting any more
    assert!(!lifecycle.skip_waiting().unwrap());
}

#[tokio::test]
async fn test_upgrade_purges_old_partitions_on_activate() {
    let old = CacheConfig {
        version: "0.9.0".to_string(),
        ..cache_config()
    };
    let network = FakeNetwork::new();
    serve_manifest(&network, &old);

    let (router, storage) = router_with(network.clone(), &old);
    Lifecycle::new(router, ClientRegistry::new(), &old)
        .install()
        .await
        .unwrap();
    storage.open_partition("smartsports-api-v0.9.0").unwrap();
    storage.open_partition("unrelated-partition").unwrap();

    let new = cache_config();
    let router = smartsports_edge::router::CacheRouter::new(
        &new,
        &common::upstream(),
        storage.clone(),
        network,
    )
    .unwrap();
    let lifecycle = Lifecycle::new(router, ClientRegistry::new(), &new);
    lifecycle.install().await.unwrap();

    assert_eq!(storage.partitions().unwrap(), vec![STATIC.to_string()]);
}

#[tokio::test]
async fn test_activation_claims_open_pages() {
    let config = cache_config();
    let network = FakeNetwork::new();
    serve_manifest(&network, &config);
    let (lifecycle, _storage, clients) = lifecycle(network, &config);

    let (_id, mut rx) = clients.connect("http://origin.test/frontend/index.html", false);
    lifecycle.install().await.unwrap();

    assert!(clients.list().iter().all(|c| c.controlled));
    assert_eq!(
        rx.try_recv().unwrap(),
        PageMessage::ControllerChanged {
            version: "1.0.0".to_string()
        }
    );
}

#[tokio::test]
async fn test_clear_cache_removes_every_partition() {
    let config = cache_config();
    let network = FakeNetwork::new();
    serve_manifest(&network, &config);
    let (lifecycle, storage, _clients) = lifecycle(network, &config);
    lifecycle.install().await.unwrap();
    storage.open_partition("smartsports-api-v1.0.0").unwrap();

    lifecycle.handle_message(ControlMessage::ClearCache).unwrap();
    assert!(storage.partitions().unwrap().is_empty());
    assert_eq!(lifecycle.state(), WorkerState::Activated);
}

#[tokio::test]
async fn test_unknown_message_is_ignored() {
    let config = cache_config();
    let (lifecycle, _storage, _clients) = lifecycle(FakeNetwork::new(), &config);
    lifecycle.handle_message(ControlMessage::Unknown).unwrap();
    assert_eq!(lifecycle.state(), WorkerState::Parsed);
}
