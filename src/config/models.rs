//! Configuration data structures for smartsports-edge.
//!
//! This module defines the schema for the application settings: the local
//! listener, the upstream origin, partition naming and storage, the precache
//! manifest, and the push/sync bridges.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Origin the router forwards network requests to.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Partition naming, storage backend and request classification.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Defaults applied to incoming push payloads.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Endpoints used by background sync.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads for the Tokio runtime.
    /// Default: Number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Settings for the upstream SmartSports origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL relative request paths are resolved against.
    /// Default: `http://127.0.0.1:8000`
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Optional whole-request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Maximum number of idle connections kept per host.
    /// Default: `10`
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,
}

/// Storage backend for cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

/// Partition naming, storage and classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix shared by all partition names.
    /// Default: `smartsports`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Version string baked into partition names. Bumping it orphans
    /// every partition of the previous version on the next activation.
    /// Default: `1.0.0`
    #[serde(default = "default_version")]
    pub version: String,

    /// Where partitions live (`memory` or `sqlite`).
    /// Default: `sqlite`
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Database file for the `sqlite` backend.
    /// Default: `~/.smartsports-edge/cache.db`
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Page served when a static request misses and the network is down.
    /// Default: `/frontend/offline.html`
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Requests whose path starts with this prefix use network-first.
    /// Default: `/api/`
    #[serde(default = "default_api_path_prefix")]
    pub api_path_prefix: String,

    /// Requests whose hostname contains this marker use network-first.
    /// Default: `api-sports`
    #[serde(default = "default_api_host_marker")]
    pub api_host_marker: String,

    /// Activate right after a successful install instead of waiting
    /// for a `SKIP_WAITING` message.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// URLs fetched into the static partition on install, in order.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,
}

/// Defaults used when a push payload omits a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,

    #[serde(default = "default_notification_body")]
    pub body: String,

    #[serde(default = "default_notification_tag")]
    pub tag: String,

    /// Page opened when the payload has no `url`.
    #[serde(default = "default_notification_url")]
    pub url: String,

    #[serde(default = "default_notification_icon")]
    pub icon: String,

    #[serde(default = "default_notification_badge")]
    pub badge: String,

    #[serde(default = "default_action_icon")]
    pub action_icon: String,
}

/// Endpoints fetched by background sync tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fetched for `sync-predictions`.
    /// Default: `/api/predictions/latest`
    #[serde(default = "default_predictions_url")]
    pub predictions_url: String,

    /// Fetched for `sync-live-scores`.
    /// Default: `/api/live/scores`
    #[serde(default = "default_live_scores_url")]
    pub live_scores_url: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to mask secret-looking query parameters in logged URLs.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub sanitize_urls: bool,
}

impl CacheConfig {
    /// Name of the install-time partition.
    pub fn static_partition(&self) -> String {
        format!("{}-v{}", self.prefix, self.version)
    }

    /// Name of the partition filled by cache-first misses.
    pub fn runtime_partition(&self) -> String {
        format!("{}-runtime-v{}", self.prefix, self.version)
    }

    /// Name of the partition filled by network-first responses.
    pub fn api_partition(&self) -> String {
        format!("{}-api-v{}", self.prefix, self.version)
    }
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            timeout_seconds: None,
            pool_max_idle_per_host: default_pool_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            version: default_version(),
            backend: default_backend(),
            sqlite_path: default_sqlite_path(),
            offline_page: default_offline_page(),
            api_path_prefix: default_api_path_prefix(),
            api_host_marker: default_api_host_marker(),
            skip_waiting_on_install: true,
            precache: default_precache(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            tag: default_notification_tag(),
            url: default_notification_url(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
            action_icon: default_action_icon(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            predictions_url: default_predictions_url(),
            live_scores_url: default_live_scores_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            sanitize_urls: true,
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_prefix() -> String {
    "smartsports".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_sqlite_path() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".smartsports-edge")
        .join("cache.db")
        .to_string_lossy()
        .to_string()
}

fn default_offline_page() -> String {
    "/frontend/offline.html".to_string()
}

fn default_api_path_prefix() -> String {
    "/api/".to_string()
}

fn default_api_host_marker() -> String {
    "api-sports".to_string()
}

fn default_true() -> bool {
    true
}

fn default_precache() -> Vec<String> {
    [
        "/frontend/",
        "/frontend/index.html",
        "/frontend/predictions.html",
        "/frontend/arena.html",
        "/frontend/chat.html",
        "/frontend/community.html",
        "/frontend/news.html",
        "/frontend/stats.html",
        "/frontend/halp_center.html",
        "/frontend/game_arena.html",
        "/frontend/differentiation.html",
        "/frontend/start_up.html",
        "/frontend/about.html",
        "/frontend/profile.html",
        "/frontend/global-styles.css",
        "/frontend/manifest.json",
        "https://fonts.googleapis.com/css2?family=Assistant:wght@300;400;600;700;800&family=JetBrains+Mono:wght@400;500;700&display=swap",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css",
        "https://cdn.jsdelivr.net/npm/chart.js",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_notification_title() -> String {
    "SMARTSPORTS".to_string()
}

fn default_notification_body() -> String {
    "עדכון חדש זמין!".to_string()
}

fn default_notification_tag() -> String {
    "smartsports-notification".to_string()
}

fn default_notification_url() -> String {
    "/frontend/index.html".to_string()
}

fn default_notification_icon() -> String {
    "/frontend/icons/icon-192x192.png".to_string()
}

fn default_notification_badge() -> String {
    "/frontend/icons/badge-72x72.png".to_string()
}

fn default_action_icon() -> String {
    "/frontend/icons/icon-96x96.png".to_string()
}

fn default_predictions_url() -> String {
    "/api/predictions/latest".to_string()
}

fn default_live_scores_url() -> String {
    "/api/live/scores".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
