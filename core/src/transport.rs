//! Transports that execute `HttpRequest`s, and the connectivity classifier.
//!
//! # Design
//! `Transport` is the I/O seam: it turns a request into a response, or into
//! an `ApiError` when no response arrived. Every HTTP status, including
//! 4xx/5xx, comes back as `Ok(HttpResponse)`; status interpretation belongs
//! to `TwinClient`. Failures where the backend process could not be reached
//! are tagged `ApiError::Offline` here, before any caller sees them.
//!
//! `probe` resolves as soon as a status line arrives. A body that stalls or
//! is cut short after that still counts as an answer.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;

    /// Send `request` and return only the response status.
    async fn probe(&self, request: HttpRequest) -> Result<u16, ApiError> {
        self.execute(request).await.map(|response| response.status)
    }
}

/// `reqwest`-backed transport with a default per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    fn prepare(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, &request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.prepare(request).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse { status, body })
    }

    async fn probe(&self, request: HttpRequest) -> Result<u16, ApiError> {
        let response = self.prepare(request).send().await.map_err(classify)?;
        Ok(response.status().as_u16())
    }
}

/// Tag a `reqwest` failure as offline, timeout, or a generic transport error.
pub fn classify(err: reqwest::Error) -> ApiError {
    let message = err.to_string();
    if err.is_timeout() {
        return ApiError::Timeout(message);
    }
    if err.is_connect() || is_connectivity_failure(&err) {
        tracing::debug!(error = %message, "backend unreachable");
        return ApiError::Offline(message);
    }
    ApiError::Transport(message)
}

/// True when any error in the source chain signals an unreachable backend:
/// a connection-refused class I/O error or a bare "network error".
pub fn is_connectivity_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if is_unreachable_kind(io_err.kind()) {
                return true;
            }
        }
        let text = e.to_string().to_ascii_lowercase();
        if text.contains("connection refused") || text == "network error" {
            return true;
        }
        current = e.source();
    }
    false
}

fn is_unreachable_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
    )
}
