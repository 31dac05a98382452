//! Backend registry.
//!
//! # Responsibilities
//! - Own the fixed set of backend records, built once at startup
//! - Serve non-blocking snapshots to coordinators
//! - Accept sample updates from health pollers

use std::time::Instant;

use crate::load_balancer::backend::{BackendRecord, Latency};

/// One entry of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSample {
    pub address: String,
    pub latency: Latency,
    pub updated_at: Option<Instant>,
}

/// Point-in-time copy of every registry entry, ordered by address.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<BackendSample>,
}

impl Snapshot {
    pub fn from_entries(mut entries: Vec<BackendSample>) -> Self {
        entries.sort_by(|a, b| a.address.cmp(&b.address));
        Self { entries }
    }

    pub fn entries(&self) -> &[BackendSample] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&BackendSample> {
        self.entries.iter().find(|e| e.address == address)
    }
}

/// Shared table of backend records.
///
/// The set of addresses never changes after construction. Every record is
/// updated with atomics, so neither reads nor writes ever block.
#[derive(Debug)]
pub struct Registry {
    records: Vec<BackendRecord>,
    epoch: Instant,
}

impl Registry {
    /// Build a registry from the configured backend addresses.
    ///
    /// Addresses are sorted (the tie-break order) and duplicates dropped.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
        addresses.sort();
        addresses.dedup();

        Self {
            records: addresses.into_iter().map(BackendRecord::new).collect(),
            epoch: Instant::now(),
        }
    }

    /// Copy the current state of every record.
    pub fn snapshot(&self) -> Snapshot {
        let entries = self
            .records
            .iter()
            .map(|r| BackendSample {
                address: r.address().to_string(),
                latency: r.latency(),
                updated_at: r.last_updated(self.epoch),
            })
            .collect();
        // Records are already in address order.
        Snapshot { entries }
    }

    /// Replace one record's sample. Returns `false` for an unknown address.
    pub fn update(&self, address: &str, latency: Latency) -> bool {
        match self.record(address) {
            Some(record) => {
                record.store(latency, self.epoch);
                true
            }
            None => {
                tracing::warn!(address = %address, "Ignoring update for unregistered backend");
                false
            }
        }
    }

    /// Configured addresses in tie-break order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(BackendRecord::address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&self, address: &str) -> Option<&BackendRecord> {
        self.records
            .binary_search_by(|r| r.address().cmp(address))
            .ok()
            .map(|i| &self.records[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const A: &str = "http://127.0.0.1:8001";
    const B: &str = "http://127.0.0.1:8002";

    #[test]
    fn test_snapshot_starts_unknown_and_sorted() {
        let registry = Registry::new([B, A]);
        let snapshot = registry.snapshot();
        let addrs: Vec<_> = snapshot.entries().iter().map(|e| e.address.as_str()).collect();
        assert_eq!(addrs, vec![A, B]);
        assert!(snapshot.entries().iter().all(|e| e.latency == Latency::Unknown));
    }

    #[test]
    fn test_update_replaces_sample() {
        let registry = Registry::new([A, B]);
        assert!(registry.update(B, Latency::Measured(30_000)));
        assert!(registry.update(B, Latency::Unavailable));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.get(B).unwrap().latency, Latency::Unavailable);
        assert!(snapshot.get(B).unwrap().updated_at.is_some());
        assert_eq!(snapshot.get(A).unwrap().latency, Latency::Unknown);
    }

    #[test]
    fn test_unknown_address_is_rejected() {
        let registry = Registry::new([A]);
        assert!(!registry.update("http://elsewhere:1", Latency::Measured(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicates_collapse() {
        let registry = Registry::new([A, A, B]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_no_growth_under_concurrent_writers() {
        let registry = Arc::new(Registry::new([A, B]));
        let handles: Vec<_> = [A, B]
            .into_iter()
            .map(|addr| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        let latency = if i % 3 == 1 { Latency::Unavailable } else { Latency::Measured(i) };
                        registry.update(addr, latency);
                        let _ = registry.snapshot();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.snapshot().len(), 2);
        assert_eq!(registry.snapshot().get(A).unwrap().latency, Latency::Measured(999));
    }
}
