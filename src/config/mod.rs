//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → PORT environment variable (overrides listener.port)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → shared by value / Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend set never changes at runtime
//! - All fields have defaults so the balancer runs with only `PORT` set
//! - Missing or malformed `PORT` is fatal at startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BackendsConfig, BalancerConfig, HealthCheckConfig, LatencyMetric,
    ListenerConfig, ObservabilityConfig, ProxyConfig,
};
