//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: any method, any path, one proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Spawn the health pollers and the optional admin listener
//! - Serve until the shutdown signal, then drain

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::{self, AdminState};
use crate::config::BalancerConfig;
use crate::health::active::HealthMonitor;
use crate::http::response::relay;
use crate::lifecycle::Shutdown;
use crate::load_balancer::Registry;
use crate::observability::metrics;
use crate::proxy::ProxyCoordinator;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ProxyCoordinator>,
    pub relay_status: bool,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    registry: Arc<Registry>,
    coordinator: Arc<ProxyCoordinator>,
}

impl HttpServer {
    /// Build the registry, coordinator and router from configuration.
    pub fn new(config: BalancerConfig) -> Self {
        let registry = Arc::new(Registry::new(config.backends.addresses().iter().cloned()));
        let coordinator = Arc::new(ProxyCoordinator::new(registry.clone(), config.proxy.clone()));

        let state = AppState {
            coordinator: coordinator.clone(),
            relay_status: config.proxy.relay_backend_status,
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            registry,
            coordinator,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Shared registry, for diagnostics and tests.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.len(),
            deadline_ms = self.config.proxy.deadline_ms,
            "HTTP server starting"
        );

        let pollers = HealthMonitor::new(self.registry.clone(), self.config.health_check.clone())
            .spawn(&shutdown);

        if self.config.admin.enabled {
            let state = AdminState::new(self.coordinator.clone(), self.config.admin.api_key.clone());
            admin::spawn(&self.config.admin.bind_address, state, &shutdown).await;
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        // Also stops pollers when serve returned for another reason.
        shutdown.trigger();
        for poller in pollers {
            let _ = poller.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler: one coordinator run per client request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();

    match state.coordinator.handle(request).await {
        Ok(backend) => {
            let response = relay(backend, state.relay_status);
            metrics::record_request("succeeded", response.status().as_u16(), started);
            response
        }
        Err(e) => {
            metrics::record_request(e.outcome(), e.status().as_u16(), started);
            axum::response::IntoResponse::into_response(e)
        }
    }
}
