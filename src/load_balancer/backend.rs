//! Backend record.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Hold the latest published latency sample (lock-free)
//! - Remember when the sample was last written (diagnostics only)

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

// Measured samples are never negative, so negative raw values are free for sentinels.
const UNKNOWN: i64 = -2;
const UNAVAILABLE: i64 = -1;

/// Latest health figure for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    /// No poll has completed yet.
    Unknown,
    /// The most recent poll failed.
    Unavailable,
    /// The most recent successful probe, in nanoseconds. Smaller is better.
    ///
    /// Only non-negative values are eligible; a negative figure counts as
    /// unavailable and is stored as such.
    Measured(i64),
}

impl Latency {
    /// Classify a raw probe figure: negative means the backend is unusable.
    pub fn from_sample(nanos: i64) -> Self {
        if nanos < 0 {
            Latency::Unavailable
        } else {
            Latency::Measured(nanos)
        }
    }

    /// Eligible for selection.
    pub fn is_available(&self) -> bool {
        self.nanos().is_some()
    }

    /// The measured value, if eligible.
    pub fn nanos(&self) -> Option<i64> {
        match self {
            Latency::Measured(n) if *n >= 0 => Some(*n),
            _ => None,
        }
    }

    /// Short lowercase label used in logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Latency::Unknown => "unknown",
            Latency::Measured(n) if *n >= 0 => "available",
            _ => "unavailable",
        }
    }

    fn encode(self) -> i64 {
        match self {
            Latency::Unknown => UNKNOWN,
            Latency::Unavailable => UNAVAILABLE,
            Latency::Measured(n) if n >= 0 => n,
            Latency::Measured(_) => UNAVAILABLE,
        }
    }

    fn decode(raw: i64) -> Self {
        match raw {
            UNKNOWN => Latency::Unknown,
            n if n < 0 => Latency::Unavailable,
            n => Latency::Measured(n),
        }
    }
}

/// A single backend server and its health sample.
#[derive(Debug)]
pub struct BackendRecord {
    /// Base URL of the backend, e.g. `http://0.0.0.0:8001`.
    address: String,
    /// Encoded [`Latency`].
    sample: AtomicI64,
    /// Nanoseconds since `epoch` plus one; zero means never written.
    updated_at: AtomicU64,
}

impl BackendRecord {
    /// Create a record in the `Unknown` state.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            sample: AtomicI64::new(UNKNOWN),
            updated_at: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current sample.
    pub fn latency(&self) -> Latency {
        Latency::decode(self.sample.load(Ordering::Acquire))
    }

    /// Overwrite the sample and stamp the write time relative to `epoch`.
    pub fn store(&self, latency: Latency, epoch: Instant) {
        let offset = epoch.elapsed().as_nanos().min(u64::MAX as u128 - 1) as u64;
        self.updated_at.store(offset + 1, Ordering::Release);
        self.sample.store(latency.encode(), Ordering::Release);
    }

    /// When the sample was last written, if ever.
    pub fn last_updated(&self, epoch: Instant) -> Option<Instant> {
        match self.updated_at.load(Ordering::Acquire) {
            0 => None,
            n => Some(epoch + Duration::from_nanos(n - 1)),
        }
    }
}
