//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → coordinator.rs (deadline, select, forward, reselect on failure)
//!     → Succeeded: buffered backend response
//!     → TimedOut / body read failure: error.rs → JSON envelope
//! ```
//!
//! # Design Decisions
//! - Every failed attempt reselects from a fresh snapshot, so a backend that
//!   just went unavailable is skipped on the very next attempt
//! - The client body is buffered once and replayed for each attempt
//! - Per-attempt timeouts are clipped to the remaining deadline

pub mod coordinator;
pub mod error;

pub use coordinator::{BackendResponse, Outcome, ProxyAttempt, ProxyCoordinator};
pub use error::{ForwardError, ProxyError, UNAVAILABLE_MESSAGE};
