//! The network seam.
//!
//! [`ResilientClient`](crate::http::ResilientClient) performs one attempt at a
//! time through a [`Transport`]. Bodies are kept as owned bytes so the same
//! request can be sent again on retry.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One form part carrying file bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FilePart {
    /// Reject a declared content type that is not a valid MIME type.
    pub fn validate_content_type(&self) -> Result<(), TransportError> {
        if let Some(content_type) = &self.content_type {
            reqwest::multipart::Part::bytes(Vec::new())
                .mime_str(content_type)
                .map_err(|_| {
                    TransportError::InvalidRequest(format!("invalid content type '{content_type}'"))
                })?;
        }
        Ok(())
    }
}

/// A multipart form: the `file` part plus caller string fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: FilePart,
}

impl MultipartForm {
    fn to_reqwest(&self) -> Result<reqwest::multipart::Form, TransportError> {
        let mut part = reqwest::multipart::Part::bytes(self.file.bytes.clone())
            .file_name(self.file.file_name.clone());
        if let Some(content_type) = &self.file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        }

        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form.part("file", part))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Multipart(MultipartForm),
}

/// A fully prepared attempt.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// A received response with the body fully read.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn status_text(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Transport backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// The client carries no overall timeout; the caller's deadline bounds
    /// each attempt.
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
            RequestBody::Multipart(form) => builder.multipart(form.to_reqwest()?),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_vec();

        Ok(TransportResponse { status, headers, body })
    }
}
