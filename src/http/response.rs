//! Response handling.
//!
//! # Responsibilities
//! - Relay a buffered backend response to the client
//! - Render every client-visible failure as `{"error": "<message>"}`
//!
//! # Design Decisions
//! - By default the client always sees 200 with the backend body, matching
//!   the behaviour existing clients depend on; `relay_backend_status` opts
//!   into passing the backend status and headers through
//! - Hop-by-hop headers stripped when relaying

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::request::end_to_end_headers;
use crate::proxy::{BackendResponse, ProxyError};

/// JSON error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Render an error envelope with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.to_string())
    }
}

/// Turn a backend response into the client response.
pub fn relay(backend: BackendResponse, relay_status: bool) -> Response {
    if relay_status {
        let mut response = (backend.status, backend.body).into_response();
        let headers = end_to_end_headers(&backend.headers);
        let target = response.headers_mut();
        for name in headers.keys() {
            target.remove(name);
        }
        for (name, value) in headers.iter() {
            if name != header::CONTENT_LENGTH {
                target.append(name.clone(), value.clone());
            }
        }
        return response;
    }

    let mut response = (StatusCode::OK, backend.body).into_response();
    if let Some(content_type) = backend.headers.get(header::CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }
    response
}
