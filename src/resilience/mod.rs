//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Client request:
//!     → timeouts.rs (overall deadline, per-attempt budget)
//!     → No eligible backend: backoff.rs (bounded pause, never past the deadline)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Waiting for health data sleeps instead of spinning

pub mod backoff;
pub mod timeouts;

pub use backoff::IdleBackoff;
pub use timeouts::Deadline;
