//! Request deadlines.
//!
//! Every client request owns one [`Deadline`]. Each network call made on its
//! behalf gets its own shorter budget, never longer than what remains.

use std::time::Duration;
use tokio::time::Instant;

/// Absolute cutoff for one client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Budget for one attempt: `per_attempt`, clipped to what remains.
    pub fn attempt_budget(&self, per_attempt: Duration) -> Duration {
        per_attempt.min(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let deadline = Deadline::after(Duration::from_secs(30));
        assert!(!deadline.is_expired());
        assert_eq!(deadline.attempt_budget(Duration::from_secs(2)), Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(deadline.attempt_budget(Duration::from_secs(2)), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }
}
