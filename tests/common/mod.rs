//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use latency_balancer::load_balancer::{Latency, Registry};
use latency_balancer::{BalancerConfig, HttpServer, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// A business backend: `/status` reports its clock, everything else reverses `data`.
#[derive(Clone)]
pub struct MockBackend {
    pub name: &'static str,
    pub address: String,
    /// Forwarded (non-status) requests received.
    pub hits: Arc<AtomicU32>,
    /// When false, `/status` answers 503.
    pub up: Arc<AtomicBool>,
    /// Number of upcoming forwarded requests to stall for 5 seconds.
    pub hang_next: Arc<AtomicU32>,
}

impl MockBackend {
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

pub async fn start_backend(name: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        name,
        address: format!("http://{}", listener.local_addr().unwrap()),
        hits: Arc::new(AtomicU32::new(0)),
        up: Arc::new(AtomicBool::new(true)),
        hang_next: Arc::new(AtomicU32::new(0)),
    };

    let app = Router::new()
        .route("/status", get(status))
        .fallback(business)
        .with_state(backend.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    backend
}

async fn status(State(backend): State<MockBackend>) -> Response {
    if !backend.up.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    nanos.to_string().into_response()
}

async fn business(State(backend): State<MockBackend>, body: Bytes) -> Response {
    backend.hits.fetch_add(1, Ordering::SeqCst);

    let hang = backend
        .hang_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if hang {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let data = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("data").and_then(Value::as_str).map(str::to_string));

    let mut response = match data {
        Some(data) => Json(json!({ "data": data.chars().rev().collect::<String>() })).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Request body contains badly-formed JSON" })),
        )
            .into_response(),
    };
    response
        .headers_mut()
        .insert("x-backend", backend.name.parse().unwrap());
    response
}

/// An `http://` address nothing is listening on.
pub async fn offline_address() -> String {
    let addr = free_addr().await;
    format!("http://{}", addr)
}

pub async fn free_addr() -> SocketAddr {
    TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap()
}

/// Configuration tuned for fast tests.
pub fn test_config(backends: Vec<String>, deadline_ms: u64) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = Some(0);
    config.backends.0 = backends;
    config.health_check.interval_ms = 50;
    config.health_check.timeout_ms = 200;
    config.proxy.deadline_ms = deadline_ms;
    config.proxy.attempt_timeout_ms = 300;
    config.proxy.idle_base_delay_ms = 10;
    config.proxy.idle_max_delay_ms = 50;
    config
}

/// Start the balancer on an ephemeral port. Returns its base URL, the
/// shutdown handle and the registry for inspection.
pub async fn start_balancer(
    config: BalancerConfig,
) -> (String, Shutdown, Arc<Registry>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let registry = server.registry();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (url, shutdown, registry)
}

/// Wait until the pollers have published a sample for every backend.
pub async fn wait_for_samples(registry: &Registry) {
    for _ in 0..100 {
        if registry
            .snapshot()
            .entries()
            .iter()
            .all(|e| e.latency != Latency::Unknown)
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("pollers never published samples");
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

pub fn reverse_payload() -> Value {
    json!({ "data": "some string" })
}
