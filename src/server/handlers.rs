// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::{AppState, MAX_BODY_BYTES};
use crate::cache::{EdgeRequest, ResponseSource, StoredResponse, CACHE_STATUS_HEADER};
use crate::error::{EdgeError, Result};
use crate::metrics;
use crate::router::{network::is_hop_by_hop, CacheRouter, Routed};
use crate::worker::{ClickOutcome, ClientRegistry, ControlMessage, Notification, SyncTag, WorkerState};
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub upstream: String,
    pub worker_state: String,
    pub partitions: Vec<String>,
    pub clients: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let worker_state = state.lifecycle.state();
    let mut status = match worker_state {
        WorkerState::Activated => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    };

    let partitions = match state.router.storage().partitions() {
        Ok(names) => names,
        Err(e) => {
            warn!("Health check could not list partitions: {}", e);
            status = HealthStatus::Unhealthy;
            Vec::new()
        }
    };

    Json(HealthResponse {
        status,
        version: state.lifecycle.version().to_string(),
        upstream: state.config.upstream.origin.clone(),
        worker_state: worker_state.as_str().to_string(),
        partitions,
        clients: state.clients.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Page → router control message (`SKIP_WAITING`, `CLEAR_CACHE`)
pub async fn message_handler(
    State(state): State<AppState>,
    Json(message): Json<ControlMessage>,
) -> Result<Json<serde_json::Value>> {
    debug!("Message received: {:?}", message);
    state.lifecycle.handle_message(message)?;
    Ok(Json(json!({
        "status": "ok",
        "worker_state": state.lifecycle.state().as_str(),
    })))
}

/// Inbound push payload (raw body, JSON or text)
pub async fn push_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let notification = state.push.handle_push(&body);
    (StatusCode::CREATED, Json(notification))
}

pub async fn notifications_handler(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.push.shown())
}

#[derive(Debug, Default, Deserialize)]
pub struct ClickRequest {
    pub action: Option<String>,
}

pub async fn notification_click_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ClickOutcome>> {
    let click: ClickRequest = if body.is_empty() {
        ClickRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let outcome = state.push.click(id, click.action.as_deref())?;
    Ok(Json(outcome))
}

pub async fn sync_handler(State(state): State<AppState>, Path(tag): Path<String>) -> Response {
    match tag.parse::<SyncTag>() {
        Ok(tag) => {
            let outcome = state.sync.run(tag).await;
            (StatusCode::ACCEPTED, Json(outcome)).into_response()
        }
        Err(e) => {
            warn!("Ignoring sync: {}", e);
            (
                StatusCode::ACCEPTED,
                Json(json!({ "status": "ignored", "tag": tag })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub url: String,
}

/// Removes a page from the registry when its event stream is dropped.
struct ClientGuard {
    registry: ClientRegistry,
    id: Uuid,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.registry.disconnect(self.id);
    }
}

/// Page message channel (server-sent events)
pub async fn clients_connect_handler(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
) -> Result<Response> {
    let url = state
        .router
        .resolve(&query.url)
        .map(|u| u.to_string())
        .unwrap_or(query.url);

    let (id, mut receiver) = state.clients.connect(url, state.lifecycle.is_controlling());
    let guard = ClientGuard {
        registry: state.clients.clone(),
        id,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<String, Infallible>(format!("event: connected\ndata: {}\n\n", json!({ "id": id })));

        loop {
            tokio::select! {
                message = receiver.recv() => {
                    match message {
                        Some(message) => yield Ok(message.to_sse()),
                        None => break,
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    // Keep idle connections from being reaped by intermediaries
                    yield Ok(": ping\n\n".to_string());
                }
            }
        }
    };

    Response::builder()
        .status(200)
        .header("Content-Type", "text/event-stream; charset=utf-8")
        .header("Cache-Control", "no-cache")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .map_err(|e| EdgeError::Internal(format!("Failed to build event stream: {}", e)))
}

/// Every other request: route through the caches once the worker controls pages.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let started = Instant::now();
    let (parts, body) = request.into_parts();

    let url = target_url(&state.router, &parts.uri)?;
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| EdgeError::InvalidRequest(format!("Failed to read request body: {}", e)))?;
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let request = EdgeRequest {
        method: parts.method.to_string(),
        url,
        headers,
        body,
    };

    if !state.lifecycle.is_controlling() {
        debug!("Worker not active yet, forwarding {} untouched", request.url.path());
        return forward(&state.router, request).await;
    }

    let strategy = state.router.classify(&request.url).strategy();
    match state.router.route(request).await {
        Routed::Bypass(request) => forward(&state.router, request).await,
        Routed::Response { response, source } => {
            metrics::observe_route_duration(strategy, started.elapsed().as_secs_f64());
            into_http_response(response, source)
        }
    }
}

/// Absolute-form targets (forward-proxy style) are used as is; origin-form
/// targets resolve against the upstream origin and must stay on it, so a
/// scheme-relative path such as `//other.host/x` is rejected.
fn target_url(router: &CacheRouter, uri: &Uri) -> Result<Url> {
    if uri.scheme().is_some() {
        return Ok(Url::parse(&uri.to_string())?);
    }
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let url = router.resolve(path)?;
    if url.origin() != router.origin().origin() {
        return Err(EdgeError::InvalidRequest(format!(
            "Request target {} leaves the upstream origin",
            path
        )));
    }
    Ok(url)
}

async fn forward(router: &CacheRouter, request: EdgeRequest) -> Result<Response> {
    let response = router.network().fetch(&request).await?;
    into_http_response(response, ResponseSource::Network)
}

fn into_http_response(response: StoredResponse, source: ResponseSource) -> Result<Response> {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        if !is_hop_by_hop(name) {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }

    builder
        .header(CACHE_STATUS_HEADER, source.as_str())
        .body(Body::from(response.body))
        .map_err(|e| EdgeError::Internal(format!("Failed to build response: {}", e)))
}
