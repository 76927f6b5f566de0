//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Environment variable overriding [`ApiConfig::base_url`].
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote API settings (base URL, default timeout).
    pub api: ApiConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Client-side rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Input, upload and token settings.
    pub security: SecurityConfig,

    /// Secure storage settings.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is appended to.
    pub base_url: String,

    /// Default per-call deadline in milliseconds.
    pub timeout_ms: u64,

    /// User-Agent sent by the HTTP transport.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000,
            user_agent: concat!("secure-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, the first one included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Fraction of the delay added as random jitter (0.0 disables).
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ratio: 0.0,
        }
    }
}

/// Client-side rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable admission control.
    pub enabled: bool,

    /// Requests allowed per endpoint per window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_ms: 60_000,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching of cacheable GET responses.
    pub enabled: bool,

    /// Lifetime of a cached response in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
        }
    }
}

/// Input sanitization and upload validation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum characters kept by text sanitization.
    pub max_input_length: usize,

    /// Allowed upload extensions, lowercase, without the leading dot.
    pub allowed_file_extensions: BTreeSet<String>,

    /// Maximum upload size in bytes.
    pub max_file_size_bytes: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_length: 10_000,
            allowed_file_extensions: [
                "jpg", "jpeg", "png", "gif", "webp", "pdf", "txt", "md", "json",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_file_size_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl SecurityConfig {
    /// Lowercase every extension and strip a leading dot, so `".PNG"` and
    /// `"png"` are the same entry.
    pub fn normalized(mut self) -> Self {
        self.allowed_file_extensions = self
            .allowed_file_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }
}

/// Secure storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the store. In-memory when unset.
    pub path: Option<String>,

    /// Maximum age of a stored record in seconds.
    pub ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            ttl_secs: 24 * 3600,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
