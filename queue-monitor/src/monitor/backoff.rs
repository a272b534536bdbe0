//! Polling backoff policy
//!
//! Pure and clock-free: the loop feeds it one `PollOutcome` per cycle and
//! sleeps for whatever it answers. Any failure doubles the base interval;
//! hitting the threshold yields one fixed long sleep and resets the counter.

use std::time::Duration;

/// Result of one reconciliation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Every fetcher and every record went through
    Success,
    /// Some fetchers or records failed but the cycle made progress
    Partial,
    /// Nothing could be fetched
    Failure,
}

/// Interval policy driven by consecutive full failures
#[derive(Debug)]
pub struct BackoffPolicy {
    base_interval: Duration,
    failure_threshold: u32,
    long_sleep: Duration,
    consecutive_failures: u32,
}

impl BackoffPolicy {
    /// Creates a policy
    #[must_use]
    pub const fn new(
        base_interval: Duration,
        failure_threshold: u32,
        long_sleep: Duration,
    ) -> Self {
        Self {
            base_interval,
            failure_threshold,
            long_sleep,
            consecutive_failures: 0,
        }
    }

    /// Records a cycle outcome and answers how long to sleep before the next
    ///
    /// Partial cycles made progress, so they reset the counter like
    /// successes do.
    pub fn next_sleep(&mut self, outcome: PollOutcome) -> Duration {
        match outcome {
            PollOutcome::Success | PollOutcome::Partial => {
                self.consecutive_failures = 0;
                self.base_interval
            }
            PollOutcome::Failure => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.failure_threshold {
                    self.consecutive_failures = 0;
                    self.long_sleep
                } else {
                    self.base_interval * 2
                }
            }
        }
    }

    /// Current consecutive-failure count
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(30), 3, Duration::from_secs(300))
    }

    #[test]
    fn success_sleeps_the_base_interval() {
        let mut p = policy();
        assert_eq!(p.next_sleep(PollOutcome::Success), Duration::from_secs(30));
        assert_eq!(p.consecutive_failures(), 0);
    }

    #[test]
    fn first_failure_doubles() {
        let mut p = policy();
        assert_eq!(p.next_sleep(PollOutcome::Failure), Duration::from_secs(60));
        assert_eq!(p.consecutive_failures(), 1);
    }

    #[test]
    fn threshold_yields_the_long_sleep_once_and_resets() {
        let mut p = policy();
        assert_eq!(p.next_sleep(PollOutcome::Failure), Duration::from_secs(60));
        assert_eq!(p.next_sleep(PollOutcome::Failure), Duration::from_secs(60));
        // Third consecutive failure reaches the threshold
        assert_eq!(p.next_sleep(PollOutcome::Failure), Duration::from_secs(300));
        assert_eq!(p.consecutive_failures(), 0);
        // The next failure starts the climb over again
        assert_eq!(p.next_sleep(PollOutcome::Failure), Duration::from_secs(60));
    }

    #[test]
    fn success_resets_the_counter_mid_climb() {
        let mut p = policy();
        p.next_sleep(PollOutcome::Failure);
        p.next_sleep(PollOutcome::Failure);
        assert_eq!(p.next_sleep(PollOutcome::Success), Duration::from_secs(30));
        // The earlier climb is forgotten
        assert_eq!(p.next_sleep(PollOutcome::Failure), Duration::from_secs(60));
    }

    #[test]
    fn partial_counts_as_progress() {
        let mut p = policy();
        p.next_sleep(PollOutcome::Failure);
        assert_eq!(p.next_sleep(PollOutcome::Partial), Duration::from_secs(30));
        assert_eq!(p.consecutive_failures(), 0);
    }
}
