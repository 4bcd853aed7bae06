use std::time::Duration;

use url::Url;

use crate::error::UrlError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Where the scan server lives and how to reach it.
///
/// Only connecting is bounded by a timeout; an open stream may stay silent
/// for as long as the remote scan takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Absolute URL for an API path such as `/history`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Absolute URL for `segments` under the base URL, each pushed as one
    /// percent-encoded path segment. Use this whenever a segment is data, such
    /// as a history id.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, UrlError> {
        let mut url = Url::parse(&self.base_url).map_err(|source| UrlError::Parse {
            base: self.base_url.clone(),
            source,
        })?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| UrlError::NotABase(self.base_url.clone()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
