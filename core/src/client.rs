//! Stateless HTTP request builder and response parser for the twin API.
//!
//! # Design
//! `TwinClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `TwinService` drives the round-trip through a `Transport` and applies the
//! failure policy on top.

use std::time::Duration;

use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::normalize::normalize_list;
use crate::types::{TwinRecord, UpdateTwin};

/// Collection path on the backend.
pub const THINGS_PATH: &str = "/mongodb/things";

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct TwinClient {
    base_url: String,
}

impl TwinClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}{THINGS_PATH}", self.base_url)
    }

    /// `id` becomes a single path segment, percent-encoded as needed.
    fn item_url(&self, id: &str) -> String {
        let collection = self.collection_url();
        let Ok(mut url) = reqwest::Url::parse(&collection) else {
            // Left for the transport to reject.
            return format!("{collection}/{id}");
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        url.into()
    }

    pub fn build_list_twins(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.collection_url(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Liveness probe: the list read with its own deadline.
    pub fn build_probe(&self, timeout: Duration) -> HttpRequest {
        HttpRequest {
            timeout: Some(timeout),
            ..self.build_list_twins()
        }
    }

    pub fn build_get_twin(&self, id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.item_url(id),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn build_create_twin(&self, record: &TwinRecord) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(record).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.collection_url(),
            headers: vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: Some(body),
            timeout: None,
        })
    }

    pub fn build_update_twin(&self, id: &str, input: &UpdateTwin) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: self.item_url(id),
            headers: vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: Some(body),
            timeout: None,
        })
    }

    pub fn build_delete_twin(&self, id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.item_url(id),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Parse a list response. Once the status is 2xx, any body that does not
    /// hold a known list shape, including one that is not JSON at all, yields
    /// an empty list.
    pub fn parse_list_twins(&self, response: HttpResponse) -> Result<Vec<TwinRecord>, ApiError> {
        check_status(&response)?;
        match serde_json::from_str::<Value>(&response.body) {
            Ok(payload) => Ok(normalize_list(payload)),
            Err(err) => {
                tracing::warn!(error = %err, len = response.body.len(), "list response is not JSON, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    pub fn parse_get_twin(&self, response: HttpResponse) -> Result<TwinRecord, ApiError> {
        parse_record(response)
    }

    pub fn parse_create_twin(&self, response: HttpResponse) -> Result<TwinRecord, ApiError> {
        parse_record(response)
    }

    pub fn parse_update_twin(&self, response: HttpResponse) -> Result<TwinRecord, ApiError> {
        parse_record(response)
    }

    pub fn parse_delete_twin(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

fn parse_record(response: HttpResponse) -> Result<TwinRecord, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
