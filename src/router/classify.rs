// Request classification (static asset vs. API call)
// Author: kelexine (https://github.com/kelexine)

use crate::config::CacheConfig;
use url::Url;

/// Which strategy a request is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Not http(s); handed back to the host untouched
    Bypass,
    /// Network-first, stored in the api partition
    Api,
    /// Cache-first, stored in the runtime partition
    Static,
}

impl RequestClass {
    pub fn strategy(&self) -> &'static str {
        match self {
            RequestClass::Bypass => "bypass",
            RequestClass::Api => "network_first",
            RequestClass::Static => "cache_first",
        }
    }
}

/// Classifies URLs by path prefix and hostname marker.
///
/// The two rules are independent: a same-origin path that merely contains the
/// host marker is still static, and a host that contains the marker is always
/// an API host whatever the path.
#[derive(Debug, Clone)]
pub struct Classifier {
    api_path_prefix: String,
    api_host_marker: String,
}

impl Classifier {
    pub fn new(api_path_prefix: impl Into<String>, api_host_marker: impl Into<String>) -> Self {
        Self {
            api_path_prefix: api_path_prefix.into(),
            api_host_marker: api_host_marker.into(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.api_path_prefix, &config.api_host_marker)
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        if !matches!(url.scheme(), "http" | "https") {
            return RequestClass::Bypass;
        }

        let api_path = !self.api_path_prefix.is_empty() && url.path().starts_with(&self.api_path_prefix);
        let api_host = !self.api_host_marker.is_empty()
            && url
                .host_str()
                .is_some_and(|host| host.contains(&self.api_host_marker));

        if api_path || api_host {
            RequestClass::Api
        } else {
            RequestClass::Static
        }
    }
}
