//! Outgoing security headers.
//!
//! # Responsibilities
//! - Build the default header set attached to every request
//! - Merge caller headers over the defaults
//! - Build the bearer `Authorization` header
//!
//! # Design Decisions
//! - Caller-supplied headers win over defaults
//! - Values that are not valid header text are dropped with a warning, never
//!   sent half-encoded

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

pub const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");
pub const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// `{Content-Type, X-Requested-With, X-CSRF-Token?}`.
pub fn secure_headers(csrf_token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));

    if let Some(token) = csrf_token {
        match HeaderValue::from_str(token) {
            Ok(value) => {
                headers.insert(X_CSRF_TOKEN, value);
            }
            Err(_) => tracing::warn!("CSRF token is not valid header text, omitting it"),
        }
    }
    headers
}

/// Overlay `overrides` on `base`, replacing any header present in both.
pub fn merge_headers(mut base: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    for name in overrides.keys() {
        base.remove(name);
        for value in overrides.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
    base
}

/// Set `Authorization: Bearer <token>`. Returns false when the token cannot
/// be encoded as a header value.
pub fn attach_bearer(headers: &mut HeaderMap, token: &str) -> bool {
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            true
        }
        Err(_) => {
            tracing::warn!(
                "Stored auth token is not valid header text, sending request without it"
            );
            false
        }
    }
}
