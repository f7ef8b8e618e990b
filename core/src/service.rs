//! The twin data-access layer.
//!
//! # Design
//! Every operation is a single attempt through the `Transport`, followed by
//! one of three outcomes:
//! - success: the parsed, normalized value;
//! - connectivity failure: reads degrade to an empty/default value, writes
//!   return an error whose `is_offline()` is true;
//! - any other failure: an operation-named `TwinError`.
//!
//! Reads degrade so a dead backend never blocks a page; writes never do,
//! since reporting an unfulfilled write as success would be wrong.

use std::sync::Arc;
use std::time::Duration;

use crate::client::TwinClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, TwinError};
use crate::http::{HttpRequest, HttpResponse};
use crate::id::generate_twin_id;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{CreateTwin, DashboardStats, TwinRecord, UpdateTwin};

#[derive(Clone)]
pub struct TwinService {
    client: TwinClient,
    transport: Arc<dyn Transport>,
    probe_timeout: Duration,
}

impl std::fmt::Debug for TwinService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwinService")
            .field("base_url", &self.client.base_url())
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

impl TwinService {
    /// Service over the default `reqwest` transport.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            client: TwinClient::new(&config.base_url),
            transport,
            probe_timeout: config.probe_timeout,
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "sending request");
        self.transport.execute(request).await
    }

    /// All twins. Returns an empty list when the backend is unreachable or
    /// answers with an unrecognized shape.
    pub async fn list_twins(&self) -> Result<Vec<TwinRecord>, TwinError> {
        let result = match self.send(self.client.build_list_twins()).await {
            Ok(response) => self.client.parse_list_twins(response),
            Err(err) => Err(err),
        };
        match result {
            Ok(twins) => {
                tracing::debug!(count = twins.len(), "listed twins");
                Ok(twins)
            }
            Err(err) if err.is_offline() => {
                tracing::warn!(error = %err, "backend offline, returning empty twin list");
                Ok(Vec::new())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to list twins");
                Err(TwinError::FetchFailed(err))
            }
        }
    }

    pub async fn get_twin(&self, id: &str) -> Result<TwinRecord, TwinError> {
        let result = match self.send(self.client.build_get_twin(id)).await {
            Ok(response) => self.client.parse_get_twin(response),
            Err(err) => Err(err),
        };
        result.map_err(|err| {
            tracing::error!(id, error = %err, "failed to fetch twin");
            TwinError::FetchFailed(err)
        })
    }

    /// Create a twin with a client-derived `{type}:{millis}` id.
    pub async fn create_twin(&self, input: CreateTwin) -> Result<TwinRecord, TwinError> {
        let id = generate_twin_id(input.twin_type);
        let record = input.into_record(id);
        let request = self
            .client
            .build_create_twin(&record)
            .map_err(TwinError::CreateFailed)?;

        let result = match self.send(request).await {
            Ok(response) => self.client.parse_create_twin(response),
            Err(err) => Err(err),
        };
        match result {
            Ok(created) => {
                tracing::info!(id = %created.id, "created twin");
                Ok(created)
            }
            Err(err) if err.is_offline() => {
                tracing::error!(id = %record.id, error = %err, "backend offline, twin not created");
                Err(TwinError::Offline(err))
            }
            Err(err) => {
                tracing::error!(id = %record.id, error = %err, "failed to create twin");
                Err(TwinError::CreateFailed(err))
            }
        }
    }

    pub async fn update_twin(&self, id: &str, input: &UpdateTwin) -> Result<TwinRecord, TwinError> {
        let request = self
            .client
            .build_update_twin(id, input)
            .map_err(TwinError::UpdateFailed)?;
        let result = match self.send(request).await {
            Ok(response) => self.client.parse_update_twin(response),
            Err(err) => Err(err),
        };
        match result {
            Ok(updated) => {
                tracing::info!(id, "updated twin");
                Ok(updated)
            }
            Err(err) => {
                tracing::error!(id, offline = err.is_offline(), error = %err, "failed to update twin");
                Err(TwinError::UpdateFailed(err))
            }
        }
    }

    pub async fn delete_twin(&self, id: &str) -> Result<(), TwinError> {
        let result = match self.send(self.client.build_delete_twin(id)).await {
            Ok(response) => self.client.parse_delete_twin(response),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                tracing::info!(id, "deleted twin");
                Ok(())
            }
            Err(err) => {
                tracing::error!(id, offline = err.is_offline(), error = %err, "failed to delete twin");
                Err(TwinError::DeleteFailed(err))
            }
        }
    }

    /// Counts by status over a fresh list. All zero on any failure.
    pub async fn dashboard_stats(&self) -> DashboardStats {
        match self.list_twins().await {
            Ok(twins) => DashboardStats::from_twins(&twins),
            Err(err) => {
                tracing::warn!(error = %err, "dashboard stats unavailable, reporting zeros");
                DashboardStats::default()
            }
        }
    }

    /// Liveness probe. Any HTTP response, whatever its status, proves the
    /// backend process is reachable. The body is never read.
    pub async fn test_connection(&self) -> bool {
        let request = self.client.build_probe(self.probe_timeout);
        tracing::debug!(path = %request.path, "probing backend");
        match self.transport.probe(request).await {
            Ok(status) => {
                tracing::trace!(status, "probe answered");
                true
            }
            Err(err) if err.is_offline() => {
                tracing::debug!(error = %err, "probe: backend offline");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "probe failed");
                false
            }
        }
    }
}
