//! Per-call request configuration.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use crate::http::transport::MultipartForm;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A request body before sanitization.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    /// Every string leaf is sanitized, then the value is JSON-encoded.
    Json(Value),
    /// Sanitized, then sent as a JSON string.
    Text(String),
    /// Sent untouched; the transport sets the boundary Content-Type.
    Multipart(MultipartForm),
}

/// Options for one API call.
#[derive(Debug, Clone)]
pub struct ApiRequestConfig {
    pub method: Method,
    /// Merged over the secure headers; these win on conflict.
    pub headers: HeaderMap,
    pub body: Option<ApiBody>,
    /// Deadline for the whole call, retries included.
    pub timeout: Duration,
    /// Total attempts, first one included.
    pub max_retries: u32,
    /// Only honored for GET.
    pub cacheable: bool,
}

impl Default for ApiRequestConfig {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            cacheable: false,
        }
    }
}

impl ApiRequestConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(ApiBody::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(ApiBody::Text(body.into()));
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(ApiBody::Multipart(form));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    pub(crate) fn uses_cache(&self) -> bool {
        self.cacheable && self.method == Method::GET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ApiRequestConfig::default();
        assert_eq!(config.method, Method::GET);
        assert!(config.body.is_none());
        assert_eq!(config.timeout, Duration::from_millis(30_000));
        assert_eq!(config.max_retries, 3);
        assert!(!config.cacheable);
    }

    #[test]
    fn test_only_get_uses_cache() {
        assert!(ApiRequestConfig::default().cacheable(true).uses_cache());
        assert!(!ApiRequestConfig::new(Method::POST)
            .json(json!({}))
            .cacheable(true)
            .uses_cache());
    }
}
