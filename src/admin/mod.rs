//! Admin diagnostics listener.
//!
//! Served on its own address so the proxy route keeps every path for
//! backends.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;

use crate::lifecycle::Shutdown;
use crate::proxy::ProxyCoordinator;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub coordinator: Arc<ProxyCoordinator>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(coordinator: Arc<ProxyCoordinator>, api_key: String) -> Self {
        Self {
            coordinator,
            api_key: api_key.into(),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Bind and serve the admin router until shutdown. Bind failures are logged,
/// not fatal: the proxy keeps serving without diagnostics.
pub async fn spawn(bind_address: &str, state: AdminState, shutdown: &Shutdown) {
    let listener = match TcpListener::bind(bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_address, error = %e, "Failed to bind admin listener");
            return;
        }
    };
    tracing::info!(address = %bind_address, "Admin listener started");

    let router = setup_admin_router(state);
    let signalled = shutdown.signalled();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(signalled).await {
            tracing::error!(error = %e, "Admin listener failed");
        }
    });
}
