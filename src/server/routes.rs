// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    clients_connect_handler, health_handler, message_handler, metrics_handler,
    notification_click_handler, notifications_handler, proxy_handler, push_handler, sync_handler,
};
use super::middleware::{request_id_layers, stamp_version};
use crate::config::AppConfig;
use crate::router::CacheRouter;
use crate::worker::{ClientRegistry, Lifecycle, PushBridge, SyncBridge};
use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Largest request body accepted for forwarding.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub router: CacheRouter,
    pub lifecycle: Lifecycle,
    pub clients: ClientRegistry,
    pub push: PushBridge,
    pub sync: SyncBridge,
}

pub fn create_router(state: AppState) -> Router {
    let (set_request_id, propagate_request_id) = request_id_layers();

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/_edge/message", post(message_handler))
        .route("/_edge/push", post(push_handler))
        .route("/_edge/notifications", get(notifications_handler))
        .route("/_edge/notifications/:id/click", post(notification_click_handler))
        .route("/_edge/sync/:tag", post(sync_handler))
        .route("/_edge/clients/connect", get(clients_connect_handler))
        // Everything else is an intercepted page request
        .fallback(proxy_handler)
        .layer(axum::middleware::from_fn_with_state(state.clone(), stamp_version))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}
