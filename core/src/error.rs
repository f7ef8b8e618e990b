//! Error types for the twin data-access layer.
//!
//! # Design
//! Two layers. `ApiError` is the cause: what went wrong on the wire or while
//! decoding. `TwinError` names the operation that failed and wraps the cause.
//! `ApiError::Offline` is the connectivity tag: it is only produced when no
//! response arrived because the backend process could not be reached, so
//! callers can tell "server down" apart from "server said no".

use thiserror::Error;

/// Transport- and parse-level failure causes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend process is unreachable (connection refused, network error).
    #[error("backend unreachable: {0}")]
    Offline(String),

    /// The request was sent but no response arrived before the deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Any other failure that happened before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server returned 404; the requested twin does not exist.
    #[error("twin not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    pub fn is_offline(&self) -> bool {
        matches!(self, ApiError::Offline(_))
    }
}

/// Operation-named failures surfaced by `TwinService`.
#[derive(Debug, Error)]
pub enum TwinError {
    /// A create could not reach the backend. Kept distinct from
    /// `CreateFailed` so a caller never mistakes it for a rejected payload.
    #[error("backend unreachable: {0}")]
    Offline(#[source] ApiError),

    #[error("fetch failed: {0}")]
    FetchFailed(#[source] ApiError),

    #[error("creation failed: {0}")]
    CreateFailed(#[source] ApiError),

    #[error("update failed: {0}")]
    UpdateFailed(#[source] ApiError),

    #[error("delete failed: {0}")]
    DeleteFailed(#[source] ApiError),
}

impl TwinError {
    /// The underlying cause.
    pub fn cause(&self) -> &ApiError {
        match self {
            TwinError::Offline(e)
            | TwinError::FetchFailed(e)
            | TwinError::CreateFailed(e)
            | TwinError::UpdateFailed(e)
            | TwinError::DeleteFailed(e) => e,
        }
    }

    /// True when the failure is connectivity-classified rather than an
    /// application error returned by a reachable backend.
    pub fn is_offline(&self) -> bool {
        self.cause().is_offline()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.cause(), ApiError::NotFound)
    }
}
