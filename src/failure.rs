use std::time::{Duration, Instant};

/// Consecutive read failures tolerated before giving up.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 50;
/// Minimum gap between two `WARN:` lines.
pub const WARN_INTERVAL: Duration = Duration::from_secs(2);
/// Pause before retrying a failed read.
pub const RETRY_DELAY: Duration = Duration::from_millis(50);

/// How the stream reacts to a failed read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Warm up, retry failed reads and give up after a run of failures.
    Resilient,
    /// Treat the first failed read as end of stream.
    Simple,
}

/// What to do after one more failed read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailureVerdict {
    /// Emit a warning for this failure.
    pub warn: bool,
    /// The failure budget is spent; stop reading.
    pub exhausted: bool,
}

/// Counts consecutive read failures and rate limits the warnings about them.
#[derive(Debug)]
pub struct FailureCounter {
    consecutive: u32,
    limit: u32,
    warn_interval: Duration,
    last_warning: Option<Instant>,
}

impl Default for FailureCounter {
    fn default() -> Self {
        Self::new(MAX_CONSECUTIVE_FAILURES, WARN_INTERVAL)
    }
}

impl FailureCounter {
    pub fn new(limit: u32, warn_interval: Duration) -> Self {
        Self {
            consecutive: 0,
            limit,
            warn_interval,
            last_warning: None,
        }
    }

    /// Record a failed read that happened at `now`.
    pub fn record_failure(&mut self, now: Instant) -> FailureVerdict {
        self.consecutive = self.consecutive.saturating_add(1);

        let warn = match self.last_warning {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.warn_interval,
        };
        if warn {
            self.last_warning = Some(now);
        }

        FailureVerdict {
            warn,
            exhausted: self.consecutive >= self.limit,
        }
    }

    /// A successful read clears the run of failures. The warning clock is kept.
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_warns() {
        let mut counter = FailureCounter::default();
        let verdict = counter.record_failure(Instant::now());
        assert!(verdict.warn);
        assert!(!verdict.exhausted);
    }

    #[test]
    fn warnings_are_rate_limited() {
        let mut counter = FailureCounter::new(1000, WARN_INTERVAL);
        let start = Instant::now();

        // One failure every 50ms for 5 seconds
        let warnings: Vec<Duration> = (0..100u32)
            .map(|n| Duration::from_millis(50) * n)
            .filter(|offset| counter.record_failure(start + *offset).warn)
            .collect();

        assert_eq!(warnings.first(), Some(&Duration::ZERO));
        for pair in warnings.windows(2) {
            assert!(pair[1] - pair[0] > WARN_INTERVAL);
        }
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn exhausted_exactly_at_limit() {
        let mut counter = FailureCounter::default();
        let now = Instant::now();
        for _ in 1..MAX_CONSECUTIVE_FAILURES {
            assert!(!counter.record_failure(now).exhausted);
        }
        assert!(counter.record_failure(now).exhausted);
        assert_eq!(counter.consecutive(), MAX_CONSECUTIVE_FAILURES);
    }

    #[test]
    fn success_resets_the_run() {
        let mut counter = FailureCounter::new(3, WARN_INTERVAL);
        let now = Instant::now();
        counter.record_failure(now);
        counter.record_failure(now);
        counter.record_success();
        assert_eq!(counter.consecutive(), 0);

        assert!(!counter.record_failure(now).exhausted);
        assert!(!counter.record_failure(now).exhausted);
        assert!(counter.record_failure(now).exhausted);
    }

    #[test]
    fn success_does_not_reset_warning_clock() {
        let mut counter = FailureCounter::default();
        let start = Instant::now();
        assert!(counter.record_failure(start).warn);
        counter.record_success();
        assert!(!counter.record_failure(start + Duration::from_millis(500)).warn);
    }
}
