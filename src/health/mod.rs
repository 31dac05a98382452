//! Health polling subsystem.
//!
//! # Data Flow
//! ```text
//! Per backend, every interval:
//!     → GET {backend}/status (bounded timeout)
//!     → parse remote clock reading (ns since epoch)
//!     → sample = remote - local send time   (or round-trip, if configured)
//!     → registry.update(backend, sample | Unavailable)
//! ```
//!
//! # Design Decisions
//! - One task per backend; a slow backend only delays its own samples
//! - Probe failures are recorded, never raised, and heal on the next success
//! - Exactly one registry write per cycle per backend

pub mod active;

pub use active::{HealthMonitor, HealthPoller, ProbeError};
