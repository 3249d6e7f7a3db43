// HTTP middleware
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header naming the cache version that answered a request.
pub const VERSION_HEADER: &str = "x-edge-version";

/// Request ID layers: assign an `x-request-id` to every intercepted request
/// and echo it on the response, cached or not.
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// Stamp the running cache version and lifecycle state on every response.
pub async fn stamp_version(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let stamp = format!("{}; {}", state.lifecycle.version(), state.lifecycle.state().as_str());
    if let Ok(value) = HeaderValue::from_str(&stamp) {
        response.headers_mut().insert(VERSION_HEADER, value);
    }
    response
}
