//! Latency-aware HTTP load balancer.
//!
//! Routes every client request to the backend with the smallest recently
//! observed latency sample, re-selecting on failure until a deadline.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod proxy;
pub mod resilience;

pub use config::schema::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
