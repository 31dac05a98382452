//! Proxy coordinator.
//!
//! # State Machine
//! ```text
//! Start ─▶ Selecting ─(backend)─▶ Forwarding ─(ok)─▶ Succeeded
//!             ▲   │                   │
//!             │   └─(none, pause)─┐   └─(failed)─┐
//!             └───────────────────┴──────────────┘
//!
//! Any state with the deadline passed ─▶ TimedOut
//! ```
//!
//! The client body is read once, on the first transition into Forwarding,
//! and reused for every later attempt. Empty passes and failed attempts share
//! one growing pause schedule, bounded by the deadline.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::http::request::{build_outbound, X_REQUEST_ID};
use crate::load_balancer::{BackendSample, FastestResponse, LoadBalancer, Registry, Snapshot};
use crate::observability::metrics;
use crate::proxy::error::{ForwardError, ProxyError};
use crate::resilience::{Deadline, IdleBackoff};

/// A fully buffered backend response.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Terminal result of a [`ProxyAttempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// Request-scoped bookkeeping. Never shared across requests.
#[derive(Debug)]
pub struct ProxyAttempt {
    pub request_id: String,
    pub deadline: Deadline,
    pub attempts: u32,
    pub selected: Option<String>,
    pub outcome: Option<Outcome>,
}

impl ProxyAttempt {
    pub fn start(request_id: String, budget: Duration) -> Self {
        Self {
            request_id,
            deadline: Deadline::after(budget),
            attempts: 0,
            selected: None,
            outcome: None,
        }
    }

    fn begin(&mut self, backend: &str) {
        self.attempts += 1;
        self.selected = Some(backend.to_string());
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }
}

/// Delivers client requests to the best backend, retrying until the deadline.
#[derive(Debug, Clone)]
pub struct ProxyCoordinator {
    registry: Arc<Registry>,
    balancer: Arc<dyn LoadBalancer>,
    client: Client<HttpConnector, Body>,
    config: ProxyConfig,
}

impl ProxyCoordinator {
    pub fn new(registry: Arc<Registry>, config: ProxyConfig) -> Self {
        Self::with_balancer(registry, Arc::new(FastestResponse::new()), config)
    }

    pub fn with_balancer(
        registry: Arc<Registry>,
        balancer: Arc<dyn LoadBalancer>,
        config: ProxyConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            balancer,
            client,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The backend the next request would go to, given `snapshot`.
    pub fn select(&self, snapshot: &Snapshot) -> Option<BackendSample> {
        self.balancer.next_server(snapshot)
    }

    /// Run one client request through the state machine.
    pub async fn handle(&self, request: Request<Body>) -> Result<BackendResponse, ProxyError> {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut attempt = ProxyAttempt::start(request_id, self.config.deadline());
        let result = self.drive(&mut attempt, request).await;

        match &result {
            Ok(response) => tracing::debug!(
                request_id = %attempt.request_id,
                attempts = attempt.attempts,
                backend = attempt.selected.as_deref().unwrap_or("-"),
                status = %response.status,
                "Request forwarded"
            ),
            Err(ProxyError::NoBackendAvailable) => tracing::warn!(
                request_id = %attempt.request_id,
                attempts = attempt.attempts,
                last_backend = attempt.selected.as_deref().unwrap_or("-"),
                "Deadline expired without a successful backend response"
            ),
            Err(e) => tracing::error!(request_id = %attempt.request_id, error = %e, "Request failed"),
        }
        result
    }

    async fn drive(
        &self,
        attempt: &mut ProxyAttempt,
        request: Request<Body>,
    ) -> Result<BackendResponse, ProxyError> {
        let (parts, body) = request.into_parts();
        let mut pending_body = Some(body);
        let mut payload: Option<Bytes> = None;
        let mut idle = IdleBackoff::new(
            Duration::from_millis(self.config.idle_base_delay_ms),
            Duration::from_millis(self.config.idle_max_delay_ms),
        );

        loop {
            if attempt.deadline.is_expired() {
                attempt.finish(Outcome::TimedOut);
                return Err(ProxyError::NoBackendAvailable);
            }

            // Selecting
            let Some(backend) = self.select(&self.registry.snapshot()) else {
                let pause = idle.next_delay(attempt.deadline.remaining());
                tracing::trace!(request_id = %attempt.request_id, ?pause, "No eligible backend, waiting");
                tokio::time::sleep(pause).await;
                continue;
            };

            // Forwarding
            let bytes = match payload.clone() {
                Some(bytes) => bytes,
                None => {
                    let body = pending_body.take().unwrap_or_else(Body::empty);
                    let bytes = self.read_body(body, attempt).await?;
                    payload = Some(bytes.clone());
                    bytes
                }
            };

            attempt.begin(&backend.address);
            let outbound = build_outbound(&parts, &backend.address, bytes, &attempt.request_id)
                .map_err(|e| {
                    attempt.finish(Outcome::Failed);
                    ProxyError::RequestBuild(e.to_string())
                })?;

            let budget = attempt.deadline.attempt_budget(self.config.attempt_timeout());
            match self.forward(outbound, budget).await {
                Ok(response) => {
                    metrics::record_attempt(&backend.address, "success");
                    attempt.finish(Outcome::Succeeded);
                    return Ok(response);
                }
                Err(e) => {
                    metrics::record_attempt(&backend.address, e.kind());
                    // Pause before reselecting, same as an empty pass.
                    let pause = idle.next_delay(attempt.deadline.remaining());
                    tracing::debug!(
                        request_id = %attempt.request_id,
                        attempt = attempt.attempts,
                        backend = %backend.address,
                        error = %e,
                        ?pause,
                        "Forwarding attempt failed, reselecting"
                    );
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }

    /// Buffer the client body, bounded by the deadline and the size limit.
    async fn read_body(&self, body: Body, attempt: &mut ProxyAttempt) -> Result<Bytes, ProxyError> {
        let read = axum::body::to_bytes(body, self.config.max_body_bytes);
        match tokio::time::timeout_at(attempt.deadline.instant(), read).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => {
                attempt.finish(Outcome::Failed);
                Err(ProxyError::ClientBodyRead(e.to_string()))
            }
            Err(_) => {
                attempt.finish(Outcome::TimedOut);
                Err(ProxyError::NoBackendAvailable)
            }
        }
    }

    /// One attempt: send and buffer the response within `budget`.
    async fn forward(&self, request: Request<Body>, budget: Duration) -> Result<BackendResponse, ForwardError> {
        let exchange = async {
            let response = self.client.request(request).await?;
            let (parts, body) = response.into_parts();
            let body = axum::body::to_bytes(Body::new(body), usize::MAX).await?;
            Ok::<_, ForwardError>(BackendResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        tokio::time::timeout(budget, exchange)
            .await
            .map_err(|_| ForwardError::Timeout(budget))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::Latency;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_config(deadline_ms: u64) -> ProxyConfig {
        ProxyConfig {
            deadline_ms,
            attempt_timeout_ms: 200,
            idle_base_delay_ms: 10,
            idle_max_delay_ms: 50,
            ..ProxyConfig::default()
        }
    }

    /// Minimal HTTP/1.1 backend. The first `hang_first` connections never answer.
    async fn backend(body: &'static str, hang_first: u32) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    if n < hang_first {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        return;
                    }
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (address, hits)
    }

    fn post(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_forwards_to_fastest_backend() {
        let (slow, slow_hits) = backend("slow", 0).await;
        let (fast, fast_hits) = backend("fast", 0).await;
        let registry = Arc::new(Registry::new([slow.clone(), fast.clone()]));
        registry.update(&slow, Latency::Measured(50_000));
        registry.update(&fast, Latency::Measured(30_000));

        let coordinator = ProxyCoordinator::new(registry, fast_config(2_000));
        let response = coordinator.handle(post(r#"{"data":"x"}"#)).await.unwrap();

        assert_eq!(response.body, Bytes::from_static(b"fast"));
        assert_eq!(fast_hits.load(Ordering::SeqCst), 1);
        assert_eq!(slow_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attempt_timeout_then_retry_succeeds() {
        let (address, hits) = backend(r#"{"data":"gnirts emos"}"#, 1).await;
        let registry = Arc::new(Registry::new([address.clone()]));
        registry.update(&address, Latency::Measured(10));

        let coordinator = ProxyCoordinator::new(registry, fast_config(3_000));
        let response = coordinator.handle(post(r#"{"data":"some string"}"#)).await.unwrap();

        assert_eq!(response.body, Bytes::from_static(br#"{"data":"gnirts emos"}"#));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_times_out_when_nothing_is_eligible() {
        let registry = Arc::new(Registry::new(["http://127.0.0.1:1", "http://127.0.0.1:2"]));
        registry.update("http://127.0.0.1:1", Latency::Unavailable);

        let coordinator = ProxyCoordinator::new(registry, fast_config(300));
        let started = tokio::time::Instant::now();
        let err = coordinator.handle(post("{}")).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, ProxyError::NoBackendAvailable));
        assert!(elapsed >= Duration::from_millis(300), "returned early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(600), "returned late: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_waits_for_backend_to_recover() {
        let (address, _) = backend("recovered", 0).await;
        let registry = Arc::new(Registry::new([address.clone()]));
        registry.update(&address, Latency::Unavailable);

        let writer = registry.clone();
        let addr = address.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            writer.update(&addr, Latency::Measured(1));
        });

        let coordinator = ProxyCoordinator::new(registry, fast_config(2_000));
        let response = coordinator.handle(post("{}")).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"recovered"));
    }

    /// Accepts every connection and drops it without answering.
    async fn refusing_backend() -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });
        (address, hits)
    }

    #[tokio::test]
    async fn test_failing_backend_is_retried_with_pauses() {
        let (address, hits) = refusing_backend().await;
        let registry = Arc::new(Registry::new([address.clone()]));
        registry.update(&address, Latency::Measured(10));

        let coordinator = ProxyCoordinator::new(registry, fast_config(500));
        let started = tokio::time::Instant::now();
        let err = coordinator.handle(post("{}")).await.unwrap_err();

        assert!(matches!(err, ProxyError::NoBackendAvailable));
        assert!(started.elapsed() >= Duration::from_millis(500));
        // 10, 20, 40, then 50 ms pauses: roughly a dozen attempts fit in 500 ms.
        let attempts = hits.load(Ordering::SeqCst);
        assert!(attempts >= 2, "expected retries, saw {}", attempts);
        assert!(attempts <= 20, "retried in a tight loop: {} attempts", attempts);
    }

    #[tokio::test]
    async fn test_oversized_body_is_not_retried() {
        let (address, hits) = backend("never", 0).await;
        let registry = Arc::new(Registry::new([address.clone()]));
        registry.update(&address, Latency::Measured(1));

        let mut config = fast_config(2_000);
        config.max_body_bytes = 4;
        let coordinator = ProxyCoordinator::new(registry, config);

        let err = coordinator.handle(post("0123456789")).await.unwrap_err();
        assert!(matches!(err, ProxyError::ClientBodyRead(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
