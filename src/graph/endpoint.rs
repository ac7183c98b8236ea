//! Resolution of relative Graph paths into absolute URLs.

use url::Url;

use crate::config::ApiConfig;

/// Joins relative API paths onto `{base}/{version}/`.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    prefix: String,
}

impl EndpointResolver {
    pub fn new(base_url: &str, version: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let version = version.trim_matches('/');
        let prefix = if version.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, version)
        };
        Self { prefix }
    }

    pub fn from_config(api: &ApiConfig) -> Self {
        Self::new(&api.base_url, &api.version)
    }

    /// Full URL for `path`. Absolute http(s) URLs pass through unchanged.
    pub fn resolve(&self, path: &str) -> String {
        if is_absolute_http(path) {
            return path.to_string();
        }
        format!("{}{}", self.prefix, path.trim_start_matches('/'))
    }
}

fn is_absolute_http(path: &str) -> bool {
    Url::parse(path)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
