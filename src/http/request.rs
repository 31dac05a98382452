//! Outbound request construction.
//!
//! # Responsibilities
//! - Rewrite the client URI onto the selected backend's base URL
//! - Copy method, end-to-end headers and the buffered body
//! - Propagate the request ID to the backend
//!
//! # Design Decisions
//! - Hop-by-hop headers and `Host` are dropped; the client sets them per connection
//! - The outbound request is rebuilt for every attempt from the cached body

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Request, Uri};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Headers meaningful only for a single connection.
pub const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Copy `source` minus hop-by-hop headers and any named in `Connection`.
pub fn end_to_end_headers(source: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = source
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source.iter() {
        if HOP_BY_HOP.contains(name) || listed.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Map the client's path and query onto `backend`.
pub fn backend_uri(backend: &str, client_uri: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = client_uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = format!("{}{}", backend.trim_end_matches('/'), path_and_query).parse::<Uri>()?;
    Ok(uri)
}

/// Build one forwarding attempt for `backend`.
pub fn build_outbound(
    parts: &Parts,
    backend: &str,
    body: Bytes,
    request_id: &str,
) -> Result<Request<Body>, axum::http::Error> {
    let uri = backend_uri(backend, &parts.uri)?;

    let mut headers = end_to_end_headers(&parts.headers);
    headers.remove(header::HOST);
    headers.insert(HeaderName::from_static(X_REQUEST_ID), HeaderValue::from_str(request_id)?);

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(map) = builder.headers_mut() {
        *map = headers;
    }
    builder.body(Body::from(body))
}
