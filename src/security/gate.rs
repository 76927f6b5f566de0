//! The security gate every request and response passes through.

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, SecurityConfig};
use crate::observability::metrics;
use crate::platform::{Clock, FileStore, Platform, StorageError};
use crate::security::csrf::{generate_token, CsrfState};
use crate::security::files::{validate_file, FileInfo, FileValidationError};
use crate::security::headers::secure_headers;
use crate::security::policy::{CspViolation, PolicyMonitor, PolicyViolation, ViolationRecord};
use crate::security::rate_limit::{RateLimitStatus, RateLimiter};
use crate::security::sanitize;
use crate::security::storage::{SecureStorage, DEFAULT_STORAGE_TTL};
use crate::security::types::SecurityResult;

/// Default ceiling for [`SecurityGate::is_request_allowed_default`].
pub const DEFAULT_MAX_REQUESTS: u32 = 100;
/// Default window for [`SecurityGate::is_request_allowed_default`].
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Sanitizes input, validates uploads, holds the CSRF token, limits request
/// rates, guards persisted state and records policy violations.
pub struct SecurityGate {
    config: SecurityConfig,
    csrf: CsrfState,
    limiter: RateLimiter,
    storage: SecureStorage,
    policy: PolicyMonitor,
    platform: Platform,
}

impl SecurityGate {
    pub fn new(config: SecurityConfig, platform: Platform) -> Self {
        Self::with_storage_ttl(config, DEFAULT_STORAGE_TTL, platform)
    }

    pub fn with_storage_ttl(
        config: SecurityConfig,
        storage_ttl: Duration,
        platform: Platform,
    ) -> Self {
        let csrf = CsrfState::initialize(
            platform.embedded_csrf_token.as_deref(),
            platform.random.as_ref(),
        );
        let limiter = RateLimiter::new(platform.clock.clone());
        let storage =
            SecureStorage::new(platform.store.clone(), platform.clock.clone(), storage_ttl);

        Self {
            config: config.normalized(),
            csrf,
            limiter,
            storage,
            policy: PolicyMonitor::default(),
            platform,
        }
    }

    /// Build a gate from the full client configuration, opening the storage
    /// file when one is configured.
    pub fn from_config(
        config: &ClientConfig,
        mut platform: Platform,
    ) -> Result<Self, StorageError> {
        if let Some(path) = &config.storage.path {
            platform.store = Arc::new(FileStore::open(path)?);
        }
        Ok(Self::with_storage_ttl(
            config.security.clone(),
            Duration::from_secs(config.storage.ttl_secs),
            platform,
        ))
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.platform.clock.clone()
    }

    // --- Input ---

    pub fn sanitize_text(&self, input: &str) -> String {
        sanitize::sanitize_text(input, self.config.max_input_length)
    }

    /// Sanitize a JSON value that must be a string.
    pub fn sanitize_text_value(&self, value: &Value) -> SecurityResult<String> {
        sanitize::sanitize_text_value(value, self.config.max_input_length)
    }

    /// Sanitize every string leaf of a JSON body.
    pub fn sanitize_json(&self, value: Value) -> Value {
        sanitize::sanitize_json(value, self.config.max_input_length)
    }

    pub fn sanitize_html(&self, input: &str) -> String {
        sanitize::sanitize_html(input)
    }

    pub fn validate_file(&self, file: &FileInfo) -> Result<String, FileValidationError> {
        validate_file(file, &self.config)
    }

    // --- Tokens & headers ---

    pub fn csrf_token(&self) -> Option<String> {
        self.csrf.get()
    }

    /// Replace the token, e.g. with one issued by the server after login.
    pub fn set_csrf_token(&self, token: impl Into<String>) {
        self.csrf.set(token.into());
    }

    /// Replace the token with a freshly generated one.
    pub fn regenerate_csrf_token(&self) -> SecurityResult<String> {
        let token = generate_token(self.platform.random.as_ref())?;
        self.csrf.set(token.clone());
        Ok(token)
    }

    pub fn secure_headers(&self) -> HeaderMap {
        secure_headers(self.csrf.get().as_deref())
    }

    // --- Storage ---

    pub fn storage(&self) -> &SecureStorage {
        &self.storage
    }

    // --- Rate limiting ---

    pub fn is_request_allowed(&self, endpoint: &str, max_requests: u32, window: Duration) -> bool {
        let allowed = self.limiter.check(endpoint, max_requests, window);
        if !allowed {
            tracing::warn!(endpoint = %endpoint, max_requests, "Client-side rate limit reached");
            metrics::record_rate_limited();
        }
        allowed
    }

    pub fn is_request_allowed_default(&self, endpoint: &str) -> bool {
        self.is_request_allowed(endpoint, DEFAULT_MAX_REQUESTS, DEFAULT_RATE_WINDOW)
    }

    pub fn rate_limit_status(&self, endpoint: &str, max_requests: u32) -> RateLimitStatus {
        self.limiter.status(endpoint, max_requests)
    }

    // --- Policy ---

    /// Break out of a foreign frame. Returns true when the document was framed.
    pub fn prevent_clickjacking(&self) -> bool {
        let context = &self.platform.context;
        if !context.is_framed() {
            return false;
        }

        let origin = context.current_origin();
        tracing::warn!(
            origin = %origin,
            "Document is framed by a foreign context, navigating top frame"
        );
        self.record_violation(PolicyViolation::FrameEmbedding {
            origin: origin.clone(),
        });
        context.navigate_top(&origin);
        true
    }

    pub fn report_csp_violation(&self, violation: CspViolation) {
        tracing::warn!(
            directive = %violation.violated_directive,
            blocked_uri = %violation.blocked_uri,
            document_uri = %violation.document_uri,
            "Content-Security-Policy violation"
        );
        self.record_violation(PolicyViolation::Csp(violation));
    }

    pub fn violations(&self) -> Vec<ViolationRecord> {
        self.policy.recent()
    }

    fn record_violation(&self, violation: PolicyViolation) {
        metrics::record_policy_violation(violation.kind());
        self.policy.record(self.platform.clock.now_ms(), violation);
    }
}

impl std::fmt::Debug for SecurityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityGate")
            .field("max_input_length", &self.config.max_input_length)
            .field("max_file_size_bytes", &self.config.max_file_size_bytes)
            .field("has_csrf_token", &self.csrf.get().is_some())
            .field("tracked_endpoints", &self.limiter.tracked_endpoints())
            .finish()
    }
}
