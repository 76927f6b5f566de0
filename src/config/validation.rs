//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, windows > 0)
//! - Check the base URL parses as an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check every semantic constraint and collect the failures.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "api.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("api.base_url", e.to_string())),
    }

    if config.api.timeout_ms == 0 {
        errors.push(ValidationError::new("api.timeout_ms", "must be greater than 0"));
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&config.retries.jitter_ratio) {
        errors.push(ValidationError::new("retries.jitter_ratio", "must be within 0.0..=1.0"));
    }
    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
        }
        if config.rate_limit.window_ms == 0 {
            errors.push(ValidationError::new("rate_limit.window_ms", "must be greater than 0"));
        }
    }
    if config.cache.enabled && config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0"));
    }
    if config.security.max_input_length == 0 {
        errors.push(ValidationError::new("security.max_input_length", "must be greater than 0"));
    }
    if config.security.allowed_file_extensions.is_empty() {
        errors.push(ValidationError::new(
            "security.allowed_file_extensions",
            "at least one extension is required",
        ));
    }
    if config.storage.ttl_secs == 0 {
        errors.push(ValidationError::new("storage.ttl_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
