// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    ROUTE_DECISIONS,
    ROUTE_DURATION,
    CACHE_OPERATIONS,
    PARTITIONS_PURGED,
    INSTALLS,
    BACKGROUND_FAILURES,
    SYNC_RUNS,
    NOTIFICATIONS,
    CONNECTED_CLIENTS,
};

/// Helper to record a routing decision
pub fn record_route(strategy: &str, source: &str) {
    ROUTE_DECISIONS.with_label_values(&[strategy, source]).inc();
}

pub fn observe_route_duration(strategy: &str, duration_secs: f64) {
    ROUTE_DURATION.with_label_values(&[strategy]).observe(duration_secs);
}

/// Helper to record partition writes
pub fn record_cache_write(partition: &str, count: usize) {
    if count > 0 {
        CACHE_OPERATIONS
            .with_label_values(&[partition, "write"])
            .inc_by(count as f64);
    }
}

pub fn record_cache_write_error(partition: &str) {
    CACHE_OPERATIONS.with_label_values(&[partition, "write_error"]).inc();
}

pub fn record_partitions_purged(reason: &str, count: usize) {
    if count > 0 {
        PARTITIONS_PURGED
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }
}

/// Helper to record lifecycle events
pub fn record_install(success: bool) {
    let status = if success { "success" } else { "failure" };
    INSTALLS.with_label_values(&[status]).inc();
}

pub fn record_background_failure(task: &str) {
    BACKGROUND_FAILURES.with_label_values(&[task]).inc();
}

/// Helper to record bridge events
pub fn record_sync(tag: &str, status: &str) {
    SYNC_RUNS.with_label_values(&[tag, status]).inc();
}

pub fn record_notification(event: &str) {
    NOTIFICATIONS.with_label_values(&[event]).inc();
}

pub fn update_connected_clients(count: usize) {
    CONNECTED_CLIENTS
        .with_label_values(&["connected"])
        .set(count as f64);
}
