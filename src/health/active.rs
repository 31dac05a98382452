//! Active health polling.
//!
//! # Responsibilities
//! - Periodically probe each backend's status endpoint
//! - Publish the latency figure (or the unavailable sentinel) to the registry

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{HealthCheckConfig, LatencyMetric};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{Latency, Registry};
use crate::observability::metrics;

/// Status bodies are a single integer; anything longer is malformed.
const MAX_STATUS_BODY: usize = 64;

/// Why a single probe failed. Never leaves the poller.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build probe request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("connection error: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("non-success status {0}")]
    Status(StatusCode),

    #[error("failed to read probe body: {0}")]
    Body(#[from] axum::Error),

    #[error("malformed status body {0:?}")]
    Malformed(String),
}

/// Spawns and owns nothing but the configuration; one poller per backend.
pub struct HealthMonitor {
    registry: Arc<Registry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<Registry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            config,
            client,
        }
    }

    /// Launch one poller task per registered backend.
    pub fn spawn(self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        tracing::info!(
            backends = self.registry.len(),
            interval_ms = self.config.interval_ms,
            path = %self.config.path,
            metric = ?self.config.metric,
            "Health pollers starting"
        );

        self.registry
            .addresses()
            .map(|address| {
                let poller = HealthPoller {
                    registry: self.registry.clone(),
                    address: address.to_string(),
                    config: self.config.clone(),
                    client: self.client.clone(),
                };
                tokio::spawn(poller.run(shutdown.subscribe()))
            })
            .collect()
    }
}

/// Polls one backend forever and owns writes to its registry record.
pub struct HealthPoller {
    registry: Arc<Registry>,
    address: String,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthPoller {
    pub fn new(
        registry: Arc<Registry>,
        address: impl Into<String>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            registry,
            address: address.into(),
            config,
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous = Latency::Unknown;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let latency = self.poll_once().await;
                    if latency.is_available() != previous.is_available() {
                        tracing::info!(
                            backend = %self.address,
                            from = previous.label(),
                            to = latency.label(),
                            "Backend availability changed"
                        );
                    }
                    previous = latency;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(backend = %self.address, "Health poller received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe cycle and write exactly one registry update.
    pub async fn poll_once(&self) -> Latency {
        let sent_at = SystemTime::now();
        let started = Instant::now();

        let latency = match self.probe().await {
            Ok(remote_nanos) => {
                let sample = match self.config.metric {
                    LatencyMetric::SkewLatency => remote_nanos.saturating_sub(unix_nanos(sent_at)),
                    LatencyMetric::RoundTrip => {
                        i64::try_from(started.elapsed().as_nanos()).unwrap_or(i64::MAX)
                    }
                };
                if sample < 0 {
                    tracing::debug!(backend = %self.address, sample, "Negative health sample, treating as unavailable");
                }
                Latency::from_sample(sample)
            }
            Err(e) => {
                tracing::debug!(backend = %self.address, error = %e, "Health probe failed");
                Latency::Unavailable
            }
        };

        self.registry.update(&self.address, latency);
        metrics::record_backend_sample(&self.address, latency);
        latency
    }

    /// Fetch the backend's clock reading, in nanoseconds since the epoch.
    async fn probe(&self) -> Result<i64, ProbeError> {
        let timeout = self.config.timeout();
        let uri = format!("{}{}", self.address.trim_end_matches('/'), self.config.path);

        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "latency-balancer-health-check")
            .body(Body::empty())?;

        let exchange = async {
            let response: hyper::Response<Incoming> = self.client.request(request).await?;
            if !response.status().is_success() {
                return Err(ProbeError::Status(response.status()));
            }
            let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_STATUS_BODY).await?;
            parse_status_body(&body)
        };

        time::timeout(timeout, exchange)
            .await
            .map_err(|_| ProbeError::Timeout(timeout))?
    }
}

/// Parse a status body: a base-10 integer, surrounding whitespace allowed.
pub fn parse_status_body(body: &[u8]) -> Result<i64, ProbeError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| ProbeError::Malformed(String::from_utf8_lossy(body).into_owned()))?;
    text.trim()
        .parse::<i64>()
        .map_err(|_| ProbeError::Malformed(text.to_string()))
}

fn unix_nanos(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
