//! The resilient API client.
//!
//! # Responsibilities
//! - Admission control, cache lookup, header and body preparation
//! - Bounded execution with retries under one deadline
//! - Error mapping, credential cleanup on 401, cache population
//!
//! # Design Decisions
//! - The same prepared request (and X-Request-ID) is sent on every attempt
//! - Nothing that fails locally (rate limit, upload validation) reaches the network
//! - The transport is a trait object so tests script responses without sockets

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::config::{ClientConfig, RateLimitConfig};
use crate::error::{ApiError, ApiResult};
use crate::http::cache::ResponseCache;
use crate::http::request::{ApiBody, ApiRequestConfig};
use crate::http::response::{error_from_response, parse_payload, ApiResponse};
use crate::http::transport::{
    FilePart, MultipartForm, RequestBody, ReqwestTransport, Transport, TransportError,
    TransportRequest, TransportResponse,
};
use crate::observability::{logging::generate_request_id, metrics};
use crate::platform::StorageError;
use crate::resilience::{parse_retry_after, AttemptOutcome, Deadline, RetryDecision, RetryPolicy};
use crate::security::files::FileInfo;
use crate::security::headers::{attach_bearer, merge_headers, X_REQUEST_ID};
use crate::security::storage::{AUTH_TOKEN_KEY, USER_DATA_KEY};
use crate::security::SecurityGate;

/// Failure to construct a client.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("Failed to build transport: {0}")]
    Transport(#[from] TransportError),
}

/// Executes API calls through the security gate with retries, a deadline
/// and a read cache.
pub struct ResilientClient {
    base_url: String,
    gate: Arc<SecurityGate>,
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    retry: RetryPolicy,
    rate_limit: RateLimitConfig,
    cache_enabled: bool,
    default_timeout: Duration,
}

impl ResilientClient {
    /// Client over the default reqwest transport.
    pub fn new(config: &ClientConfig, gate: Arc<SecurityGate>) -> Result<Self, ClientBuildError> {
        let transport = ReqwestTransport::new(&config.api.user_agent)?;
        Self::with_transport(config, gate, Arc::new(transport))
    }

    pub fn with_transport(
        config: &ClientConfig,
        gate: Arc<SecurityGate>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientBuildError> {
        let base = Url::parse(&config.api.base_url)?;
        let cache = ResponseCache::new(gate.clock(), Duration::from_secs(config.cache.ttl_secs));

        tracing::debug!(
            base_url = %base,
            max_attempts = config.retries.max_attempts,
            cache_enabled = config.cache.enabled,
            rate_limit_enabled = config.rate_limit.enabled,
            "API client configured"
        );

        Ok(Self {
            base_url: base.as_str().trim_end_matches('/').to_string(),
            gate,
            transport,
            cache,
            retry: RetryPolicy::from_config(&config.retries),
            rate_limit: config.rate_limit.clone(),
            cache_enabled: config.cache.enabled,
            default_timeout: Duration::from_millis(config.api.timeout_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn gate(&self) -> &Arc<SecurityGate> {
        &self.gate
    }

    /// A request config carrying this client's timeout and attempt budget.
    pub fn request_config(&self, method: Method) -> ApiRequestConfig {
        ApiRequestConfig::new(method)
            .timeout(self.default_timeout)
            .max_retries(self.retry.max_attempts)
    }

    /// Run one API call through the full pipeline.
    pub async fn request(
        &self,
        endpoint: &str,
        config: ApiRequestConfig,
    ) -> ApiResult<ApiResponse> {
        let start = Instant::now();
        let method = config.method.clone();
        let result = self.execute(endpoint, config).await;

        let status = match &result {
            Ok(response) => response.status,
            Err(error) => error.status,
        };
        metrics::record_request(method.as_str(), status, start);
        result
    }

    /// Like [`request`](Self::request), deserializing the payload into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        config: ApiRequestConfig,
    ) -> ApiResult<ApiResponse<T>> {
        self.request(endpoint, config).await?.json()
    }

    pub async fn get(&self, endpoint: &str) -> ApiResult<ApiResponse> {
        self.request(endpoint, self.request_config(Method::GET)).await
    }

    /// GET served from the response cache while a live entry exists.
    pub async fn get_cached(&self, endpoint: &str) -> ApiResult<ApiResponse> {
        self.request(endpoint, self.request_config(Method::GET).cacheable(true))
            .await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(endpoint, self.request_config(Method::POST).json(body))
            .await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(endpoint, self.request_config(Method::PUT).json(body))
            .await
    }

    pub async fn patch(&self, endpoint: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(endpoint, self.request_config(Method::PATCH).json(body))
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> ApiResult<ApiResponse> {
        self.request(endpoint, self.request_config(Method::DELETE)).await
    }

    /// Validate `file`, then POST it as the `file` part of a multipart form
    /// together with `fields`.
    pub async fn upload_file(
        &self,
        endpoint: &str,
        mut file: FilePart,
        fields: Vec<(String, String)>,
    ) -> ApiResult<ApiResponse> {
        let info = FileInfo::new(file.file_name.clone(), file.bytes.len() as u64);
        let sanitized = self.gate.validate_file(&info).map_err(|e| {
            tracing::warn!(endpoint = %endpoint, file = %info.name, error = %e, "Upload rejected");
            ApiError::invalid_file(e.to_string())
        })?;
        file.validate_content_type().map_err(|e| {
            tracing::warn!(endpoint = %endpoint, file = %info.name, error = %e, "Upload rejected");
            ApiError::invalid_file(e.to_string())
        })?;
        file.file_name = sanitized;

        let form = MultipartForm { fields, file };
        self.request(endpoint, self.request_config(Method::POST).multipart(form))
            .await
    }

    // --- Credentials & cache ---

    pub fn set_auth_token(&self, token: &str) -> Result<(), StorageError> {
        self.gate.storage().set_item(AUTH_TOKEN_KEY, token)
    }

    pub fn set_user_data(&self, user: &Value) -> Result<(), StorageError> {
        self.gate.storage().set_item(USER_DATA_KEY, &serde_json::to_string(user)?)
    }

    /// Stored user profile; an unreadable record reads as absent.
    pub fn user_data(&self) -> Result<Option<Value>, StorageError> {
        Ok(self
            .gate
            .storage()
            .get_item(USER_DATA_KEY)?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    pub fn clear_credentials(&self) -> Result<(), StorageError> {
        self.gate.storage().clear_credentials()
    }

    pub fn invalidate_cache(&self, endpoint: &str) -> bool {
        self.cache.invalidate(endpoint)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // --- Pipeline ---

    async fn execute(&self, endpoint: &str, config: ApiRequestConfig) -> ApiResult<ApiResponse> {
        // 1. Admission control
        if self.rate_limit.enabled
            && !self.gate.is_request_allowed(
                endpoint,
                self.rate_limit.max_requests,
                self.rate_limit.window(),
            )
        {
            return Err(ApiError::rate_limited(endpoint));
        }

        // 2. Cache check
        let use_cache = self.cache_enabled && config.uses_cache();
        if use_cache {
            if let Some(data) = self.cache.get(endpoint) {
                tracing::debug!(endpoint = %endpoint, "Serving cached response");
                return Ok(ApiResponse {
                    data,
                    status: 200,
                    headers: HeaderMap::new(),
                    cached: true,
                });
            }
        }

        // 3. Headers
        let request_id = generate_request_id();
        let mut headers = merge_headers(self.gate.secure_headers(), &config.headers);
        match self.gate.storage().get_item(AUTH_TOKEN_KEY) {
            Ok(Some(token)) => {
                attach_bearer(&mut headers, &token);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Could not read auth token, sending request without it")
            }
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(X_REQUEST_ID, value);
        }

        // 4. Body
        let body = match config.body {
            None => RequestBody::Empty,
            Some(ApiBody::Json(value)) => {
                RequestBody::Bytes(encode(&self.gate.sanitize_json(value))?)
            }
            Some(ApiBody::Text(text)) => {
                let sanitized = Value::String(self.gate.sanitize_text(&text));
                RequestBody::Bytes(encode(&sanitized)?)
            }
            Some(ApiBody::Multipart(form)) => {
                headers.remove(CONTENT_TYPE);
                RequestBody::Multipart(form)
            }
        };

        let request = TransportRequest {
            method: config.method,
            url: self.url_for(endpoint)?,
            headers,
            body,
        };

        // 5-6. Bounded execution with retries
        let deadline = Deadline::after(config.timeout);
        let policy = self.retry.with_max_attempts(config.max_retries);
        let response = self
            .send_with_retries(&request, &request_id, &policy, &deadline)
            .await?;

        // 7. Error mapping
        if !(200..300).contains(&response.status) {
            let error = error_from_response(&response);
            if response.status == 401 {
                tracing::warn!(
                    request_id = %request_id,
                    "Unauthorized, clearing stored credentials"
                );
                if let Err(e) = self.gate.storage().clear_credentials() {
                    tracing::error!(error = %e, "Failed to clear credentials");
                }
            }
            tracing::warn!(
                request_id = %request_id,
                endpoint = %endpoint,
                status = response.status,
                code = %error.code,
                "Request failed"
            );
            return Err(error);
        }

        // 8. Parse
        let data = parse_payload(response.status, &response.headers, &response.body)?;

        // 9. Cache population
        if use_cache && response.status == 200 {
            self.cache.insert(endpoint, data.clone());
        }

        Ok(ApiResponse {
            data,
            status: response.status,
            headers: response.headers,
            cached: false,
        })
    }

    async fn send_with_retries(
        &self,
        request: &TransportRequest,
        request_id: &str,
        policy: &RetryPolicy,
        deadline: &Deadline,
    ) -> ApiResult<TransportResponse> {
        let mut attempt = 0u32;
        loop {
            if attempt > 0 && deadline.is_expired() {
                tracing::warn!(request_id = %request_id, attempt, "Deadline passed before retry");
                return Err(ApiError::timeout(deadline.budget()));
            }

            tracing::debug!(
                request_id = %request_id,
                method = %request.method,
                url = %request.url,
                attempt,
                "Sending request"
            );

            let result = match deadline.run(self.transport.send(request)).await {
                Ok(result) => result,
                Err(elapsed) => {
                    tracing::warn!(
                        request_id = %request_id,
                        attempt,
                        elapsed = ?deadline.elapsed(),
                        "Request timed out"
                    );
                    return Err(ApiError::timeout(elapsed.0));
                }
            };

            let (outcome, failure) = match result {
                Ok(response) => {
                    let retry_after = response.header("retry-after").and_then(parse_retry_after);
                    let outcome = AttemptOutcome::Response {
                        status: response.status,
                        retry_after,
                    };
                    match policy.decide(attempt, &outcome) {
                        RetryDecision::Retry { after, reason } => {
                            tracing::info!(
                                request_id = %request_id,
                                attempt,
                                status = response.status,
                                delay = ?after,
                                "Retrying request"
                            );
                            metrics::record_retry(reason);
                            tokio::time::sleep(after).await;
                            attempt += 1;
                            continue;
                        }
                        RetryDecision::Return | RetryDecision::GiveUp => return Ok(response),
                    }
                }
                // Failed before any I/O; never retried.
                Err(e @ TransportError::InvalidRequest(_)) => {
                    tracing::error!(
                        request_id = %request_id,
                        error = %e,
                        "Request could not be built"
                    );
                    return Err(ApiError::unknown(e.to_string()));
                }
                Err(e) => (AttemptOutcome::TransportFailure, e),
            };

            tracing::error!(request_id = %request_id, attempt, error = %failure, "Transport error");
            match policy.decide(attempt, &outcome) {
                RetryDecision::Retry { after, reason } => {
                    tracing::info!(
                        request_id = %request_id,
                        attempt,
                        delay = ?after,
                        "Retrying after network error"
                    );
                    metrics::record_retry(reason);
                    tokio::time::sleep(after).await;
                    attempt += 1;
                }
                RetryDecision::Return | RetryDecision::GiveUp => {
                    return Err(ApiError::network(format!("Network error: {failure}")));
                }
            }
        }
    }

    fn url_for(&self, endpoint: &str) -> ApiResult<Url> {
        let joined = if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };
        Url::parse(&joined)
            .map_err(|e| ApiError::unknown(format!("Invalid request URL '{joined}': {e}")))
    }
}

fn encode(value: &Value) -> ApiResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| ApiError::unknown(format!("Failed to encode request body: {e}")))
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("cache_enabled", &self.cache_enabled)
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}
