//! Resilient data-access layer for digital twin records.
//!
//! # Overview
//! Talks to a document-store backend over HTTP (`/mongodb/things`), normalizes
//! its list responses, and classifies failures so that callers can degrade
//! gracefully when the backend is unreachable instead of surfacing errors.
//!
//! # Design
//! - `TwinClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network.
//! - `Transport` performs the round-trip; `ReqwestTransport` is the real one
//!   and tags unreachable-backend failures as `ApiError::Offline`.
//! - `TwinService` is the public surface: reads degrade to empty/default on
//!   offline, writes always report failure.
//! - `ConnectivityMonitor` probes the backend on an interval and publishes
//!   the result through a `ConnectivityState` cell.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod id;
pub mod monitor;
pub mod normalize;
pub mod service;
pub mod transport;
pub mod types;

pub use client::TwinClient;
pub use config::ClientConfig;
pub use error::{ApiError, TwinError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use monitor::{ConnectivityMonitor, ConnectivityProbe, ConnectivityState, MonitorHandle};
pub use service::TwinService;
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AttributesPatch, CreateTwin, DashboardStats, Features, TwinAttributes, TwinRecord, TwinStatus, TwinType,
    UpdateTwin,
};
