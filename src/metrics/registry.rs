// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // ROUTING METRICS
    // ============================================================================

    /// Routed requests by strategy and response source
    pub static ref ROUTE_DECISIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("edge_route_decisions_total", "Total routed requests"),
        &["strategy", "source"], // source: hit, miss, network, fallback, offline
        REGISTRY
    ).unwrap();

    /// Time spent serving a routed request
    pub static ref ROUTE_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("edge_route_duration_seconds", "Routed request duration in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["strategy"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Partition writes
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("edge_cache_operations_total", "Total cache partition operations"),
        &["partition", "operation"], // operation: write, write_error
        REGISTRY
    ).unwrap();

    /// Partitions deleted
    pub static ref PARTITIONS_PURGED: CounterVec = register_counter_vec_with_registry!(
        Opts::new("edge_partitions_purged_total", "Total cache partitions deleted"),
        &["reason"], // reason: upgrade, clear
        REGISTRY
    ).unwrap();

    // ============================================================================
    // LIFECYCLE METRICS
    // ============================================================================

    /// Install attempts
    pub static ref INSTALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("edge_installs_total", "Total precache install attempts"),
        &["status"], // status: success, failure
        REGISTRY
    ).unwrap();

    /// Failures of detached work nobody waits on
    pub static ref BACKGROUND_FAILURES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("edge_background_failures_total", "Total failed background tasks"),
        &["task"], // task: revalidate, sync
        REGISTRY
    ).unwrap();

    // ============================================================================
    // BRIDGE METRICS
    // ============================================================================

    /// Background sync runs
    pub static ref SYNC_RUNS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("edge_sync_runs_total", "Total background sync runs"),
        &["tag", "status"], // status: success, skipped, failure
        REGISTRY
    ).unwrap();

    /// Notification events
    pub static ref NOTIFICATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("edge_notifications_total", "Total notification events"),
        &["event"], // event: shown, focused, opened, closed
        REGISTRY
    ).unwrap();

    /// Connected pages
    pub static ref CONNECTED_CLIENTS: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("edge_clients_current", "Current number of connected pages"),
        &["state"], // state: connected
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
