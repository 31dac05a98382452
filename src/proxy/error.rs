//! Proxy error taxonomy.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Message sent to clients when the deadline expires.
pub const UNAVAILABLE_MESSAGE: &str = "business server not available";

/// Errors surfaced to the client. Each maps to one JSON error envelope.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No backend answered before the request deadline.
    #[error("{}", UNAVAILABLE_MESSAGE)]
    NoBackendAvailable,

    /// The inbound request body could not be read. Not retried.
    #[error("failed to read request body: {0}")]
    ClientBodyRead(String),

    /// The outbound request could not be constructed.
    #[error("failed to build backend request: {0}")]
    RequestBuild(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoBackendAvailable => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::ClientBodyRead(_) | ProxyError::RequestBuild(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProxyError::NoBackendAvailable => "timed_out",
            ProxyError::ClientBodyRead(_) | ProxyError::RequestBuild(_) => "failed",
        }
    }
}

/// Why one forwarding attempt failed. Recovered by re-selection.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("connection error: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read backend body: {0}")]
    Body(#[from] axum::Error),
}

impl ForwardError {
    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Request(_) => "connect_error",
            ForwardError::Timeout(_) => "timeout",
            ForwardError::Body(_) => "body_error",
        }
    }
}
