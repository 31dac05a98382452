//! Fastest-response load balancing strategy.

use crate::load_balancer::registry::{BackendSample, Snapshot};
use crate::load_balancer::LoadBalancer;

/// Pick the available backend with the smallest sample.
///
/// Unknown and unavailable backends are skipped. Ties go to the address that
/// sorts first, so the result depends only on the snapshot contents.
pub fn select_fastest(snapshot: &Snapshot) -> Option<&BackendSample> {
    snapshot
        .entries()
        .iter()
        .filter_map(|entry| entry.latency.nanos().map(|n| (n, entry)))
        .min_by(|(a_n, a), (b_n, b)| a_n.cmp(b_n).then_with(|| a.address.cmp(&b.address)))
        .map(|(_, entry)| entry)
}

/// Fastest-response selector.
#[derive(Debug, Default)]
pub struct FastestResponse;

impl FastestResponse {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for FastestResponse {
    fn next_server(&self, snapshot: &Snapshot) -> Option<BackendSample> {
        select_fastest(snapshot).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::Latency;

    const A: &str = "http://127.0.0.1:8001";
    const B: &str = "http://127.0.0.1:8002";
    const C: &str = "http://127.0.0.1:8003";

    fn snapshot(entries: &[(&str, Latency)]) -> Snapshot {
        Snapshot::from_entries(
            entries
                .iter()
                .map(|(address, latency)| BackendSample {
                    address: address.to_string(),
                    latency: *latency,
                    updated_at: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_picks_smallest_sample() {
        let s = snapshot(&[(A, Latency::Measured(50_000)), (B, Latency::Measured(30_000))]);
        assert_eq!(select_fastest(&s).unwrap().address, B);
    }

    #[test]
    fn test_falls_back_when_best_becomes_unavailable() {
        let s = snapshot(&[(A, Latency::Measured(50_000)), (B, Latency::Unavailable)]);
        assert_eq!(select_fastest(&s).unwrap().address, A);
    }

    #[test]
    fn test_excludes_unknown_and_unavailable() {
        let s = snapshot(&[(A, Latency::Unknown), (B, Latency::Unavailable)]);
        assert!(select_fastest(&s).is_none());

        let single = snapshot(&[(A, Latency::Unavailable)]);
        assert!(select_fastest(&single).is_none());

        assert!(select_fastest(&Snapshot::default()).is_none());
    }

    #[test]
    fn test_tie_breaks_on_address_order() {
        let s = snapshot(&[
            (C, Latency::Measured(10)),
            (B, Latency::Measured(10)),
            (A, Latency::Measured(20)),
        ]);
        for _ in 0..10 {
            assert_eq!(select_fastest(&s).unwrap().address, B);
        }
    }

    #[test]
    fn test_negative_sample_is_excluded() {
        let s = snapshot(&[(A, Latency::Measured(-5_000)), (B, Latency::Measured(46_687))]);
        assert_eq!(select_fastest(&s).unwrap().address, B);

        let only_negative = snapshot(&[(A, Latency::Measured(-5_000))]);
        assert!(select_fastest(&only_negative).is_none());
    }

    #[test]
    fn test_recovered_backend_is_selectable_immediately() {
        let registry = crate::load_balancer::registry::Registry::new([A, B]);
        registry.update(A, Latency::Measured(50_000));
        registry.update(B, Latency::Unavailable);
        assert_eq!(FastestResponse::new().next_server(&registry.snapshot()).unwrap().address, A);

        registry.update(B, Latency::Measured(30_000));
        assert_eq!(FastestResponse::new().next_server(&registry.snapshot()).unwrap().address, B);
    }
}
