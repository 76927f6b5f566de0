//! Response parsing and error mapping.
//!
//! # Responsibilities
//! - Decode the final body by Content-Type (JSON, text, binary)
//! - Turn a non-2xx response into an [`ApiError`] using the server's
//!   `{message?, detail?, code?}` body when it sends one
//!
//! # Design Decisions
//! - A server-supplied code wins only when it names a taxonomy value
//! - FastAPI-style `detail` arrays are kept whole in `details`

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::http::transport::TransportResponse;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
    Empty,
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// A successful call.
#[derive(Debug, Clone)]
pub struct ApiResponse<T = Payload> {
    pub data: T,
    pub status: u16,
    pub headers: HeaderMap,
    /// Served from the response cache without a network call.
    pub cached: bool,
}

impl ApiResponse<Payload> {
    /// Deserialize a JSON payload into `T`. An empty body reads as `null`.
    pub fn json<T: DeserializeOwned>(self) -> ApiResult<ApiResponse<T>> {
        let value = match self.data {
            Payload::Json(v) => v,
            Payload::Empty => Value::Null,
            Payload::Text(_) | Payload::Binary(_) => {
                return Err(ApiError::invalid_json(self.status, "Response body is not JSON"));
            }
        };
        let data = serde_json::from_value(value).map_err(|e| {
            ApiError::invalid_json(self.status, format!("Unexpected response shape: {e}"))
        })?;

        Ok(ApiResponse {
            data,
            status: self.status,
            headers: self.headers,
            cached: self.cached,
        })
    }
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn is_json(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime == "application/json" || mime.ends_with("+json")
}

/// Decode a successful body.
pub fn parse_payload(status: u16, headers: &HeaderMap, body: &[u8]) -> ApiResult<Payload> {
    if body.is_empty() {
        return Ok(Payload::Empty);
    }

    let content_type = content_type(headers);
    if is_json(&content_type) {
        serde_json::from_slice(body).map(Payload::Json).map_err(|e| {
            ApiError::invalid_json(status, format!("Failed to parse JSON response: {e}"))
        })
    } else if content_type.starts_with("text/") {
        Ok(Payload::Text(String::from_utf8_lossy(body).into_owned()))
    } else {
        Ok(Payload::Binary(body.to_vec()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<Value>,
    code: Option<Value>,
}

/// Build the error for a final non-2xx response.
pub fn error_from_response(response: &TransportResponse) -> ApiError {
    let raw: Option<Value> = serde_json::from_slice(&response.body).ok();
    let body: ErrorBody = raw
        .as_ref()
        .and_then(|v| ErrorBody::deserialize(v).ok())
        .unwrap_or_default();

    let detail_text = body.detail.as_ref().and_then(Value::as_str).map(str::to_string);
    let message = body
        .message
        .filter(|m| !m.is_empty())
        .or(detail_text)
        .unwrap_or_else(|| response.status_text().to_string());

    let named_code = body
        .code
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|c| c.parse::<ErrorCode>().ok());
    let code = named_code.unwrap_or_else(|| ErrorCode::from_status(response.status));

    let mut error = ApiError::new(code, response.status, message);
    if let Some(detail) = body.detail.filter(|d| !d.is_string() && !d.is_null()) {
        error = error.with_details(detail);
    } else if body.code.is_some() && named_code.is_none() {
        if let Some(raw) = raw {
            error = error.with_details(raw);
        }
    }
    error
}
