//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (port, bind host).
    pub listener: ListenerConfig,

    /// Backend base URLs. Fixed for the lifetime of the process.
    pub backends: BackendsConfig,

    /// Health poller settings.
    pub health_check: HealthCheckConfig,

    /// Proxy coordinator settings (deadline, attempt timeout).
    pub proxy: ProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin diagnostics listener.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind on.
    pub host: String,

    /// Port to listen on. Usually supplied by the `PORT` environment variable.
    pub port: Option<u16>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
        }
    }
}

impl ListenerConfig {
    /// The `host:port` bind address, if a port is configured.
    pub fn bind_address(&self) -> Option<String> {
        self.port.map(|port| format!("{}:{}", self.host, port))
    }
}

/// Statically configured backend list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BackendsConfig(pub Vec<String>);

impl Default for BackendsConfig {
    fn default() -> Self {
        Self(vec![
            "http://0.0.0.0:8001".to_string(),
            "http://0.0.0.0:8002".to_string(),
        ])
    }
}

impl BackendsConfig {
    pub fn addresses(&self) -> &[String] {
        &self.0
    }
}

/// Which figure the health pollers publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LatencyMetric {
    /// Remote timestamp minus local send time (includes clock skew).
    #[default]
    SkewLatency,
    /// Locally measured round-trip time of the probe.
    RoundTrip,
}

/// Health poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Poll period in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path of the status endpoint on each backend.
    pub path: String,

    /// Published metric.
    pub metric: LatencyMetric,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 250,
            timeout_ms: 1000,
            path: "/status".to_string(),
            metric: LatencyMetric::SkewLatency,
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Proxy coordinator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Overall per-request deadline in milliseconds.
    pub deadline_ms: u64,

    /// Timeout for a single forwarding attempt in milliseconds.
    pub attempt_timeout_ms: u64,

    /// First pause when no backend is eligible, in milliseconds.
    pub idle_base_delay_ms: u64,

    /// Upper bound for the pause when no backend is eligible, in milliseconds.
    pub idle_max_delay_ms: u64,

    /// Largest client body the balancer will buffer for forwarding.
    pub max_body_bytes: usize,

    /// Relay the backend's status code and headers instead of always answering 200.
    pub relay_backend_status: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 30_000,
            attempt_timeout_ms: 2_000,
            idle_base_delay_ms: 50,
            idle_max_delay_ms: 250,
            max_body_bytes: 16 * 1024 * 1024,
            relay_backend_status: false,
        }
    }
}

impl ProxyConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "latency_balancer=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin diagnostics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin listener bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: placeholder, override before enabling.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
