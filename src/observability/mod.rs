//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pollers, coordinators, listeners produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the client request into every attempt log line
//! - Per-attempt failures log at debug; only deadline expiry logs at warn

pub mod logging;
pub mod metrics;
