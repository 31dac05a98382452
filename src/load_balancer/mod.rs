//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Health pollers
//!     → registry.rs (update one backend's sample)
//!
//! Client request
//!     → registry.rs (snapshot all samples, never blocks)
//!     → fastest.rs (pick smallest available sample)
//!     → Return backend address or none
//! ```
//!
//! # Design Decisions
//! - The backend set is fixed at startup; records are never added or removed
//! - Samples live in atomics, so pollers and coordinators never contend on a lock
//! - Selection is a pure function of the snapshot; ties resolve by address order

pub mod backend;
pub mod fastest;
pub mod registry;

pub use backend::{BackendRecord, Latency};
pub use fastest::{select_fastest, FastestResponse};
pub use registry::{BackendSample, Registry, Snapshot};

/// Backend selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Choose a backend from the snapshot, or `None` if nothing is eligible.
    fn next_server(&self, snapshot: &Snapshot) -> Option<BackendSample>;
}
