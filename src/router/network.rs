// Network seam used by the router, and its reqwest implementation
// Author: kelexine (https://github.com/kelexine)

use crate::cache::{EdgeRequest, StoredResponse};
use crate::config::UpstreamConfig;
use crate::error::{EdgeError, Result};
use crate::utils::logging::sanitize_url;
use futures::future::BoxFuture;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

/// Headers that describe a single connection and must not be forwarded or replayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Something that can perform a request.
///
/// `Ok` means the remote answered, whatever the status code. `Err` is reserved
/// for transport failures (unreachable, reset, body read error), which is what
/// the caching strategies treat as "offline".
pub trait Network: Send + Sync {
    fn fetch<'a>(&'a self, request: &'a EdgeRequest) -> BoxFuture<'a, Result<StoredResponse>>;
}

/// Network access over a pooled reqwest client.
pub struct HttpNetwork {
    http_client: Client,
}

impl HttpNetwork {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .use_rustls_tls();

        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| EdgeError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client with connection pooling and keep-alive");
        Ok(Self { http_client })
    }

    async fn send(&self, request: &EdgeRequest) -> Result<StoredResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| EdgeError::InvalidRequest(format!("Bad method {}: {}", request.method, e)))?;

        let mut builder = self.http_client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EdgeError::Network(format!("{}: {}", sanitize_url(request.url.as_str()), e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| EdgeError::Network(format!("Failed to read response body: {}", e)))?;

        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            sanitize_url(request.url.as_str()),
            status,
            body.len()
        );

        Ok(StoredResponse::new(status, headers, body))
    }
}

impl Network for HttpNetwork {
    fn fetch<'a>(&'a self, request: &'a EdgeRequest) -> BoxFuture<'a, Result<StoredResponse>> {
        Box::pin(self.send(request))
    }
}
