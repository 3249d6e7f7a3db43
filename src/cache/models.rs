//! Request and response models stored in cache partitions.

// Author: kelexine (https://github.com/kelexine)

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// Header attached to every routed response naming where it came from.
pub const CACHE_STATUS_HEADER: &str = "x-edge-cache";

/// A request as seen by the router: method, absolute URL and headers.
#[derive(Debug, Clone)]
pub struct EdgeRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl EdgeRequest {
    /// Convenience constructor for a bodiless GET.
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Only GET requests are read from or written to partitions.
    pub fn is_cacheable(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Partition key for this request.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.method, &self.url)
    }
}

/// Identity of a stored entry: upper-cased method plus the URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(format!("{} {}", method.to_ascii_uppercase(), url))
    }

    /// Rebuild a key read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A response body plus the metadata needed to replay it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            stored_at: Utc::now(),
        }
    }

    /// Mirrors the browser's `response.ok`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace (or add) a header, case-insensitively.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from a partition (cache-first hit)
    CacheHit,
    /// Fetched after a cache-first miss
    CacheMiss,
    /// Fetched by network-first, or forwarded uncached
    Network,
    /// Network failed; served from a partition
    Fallback,
    /// Network failed and nothing was stored; synthesized
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::CacheHit => "hit",
            ResponseSource::CacheMiss => "miss",
            ResponseSource::Network => "network",
            ResponseSource::Fallback => "fallback",
            ResponseSource::Offline => "offline",
        }
    }
}
