use std::time::Duration;

/// Largest exponent applied to the base delay
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Attempt budget and exponential backoff schedule for one fetch
///
/// # Examples
///
/// ```
/// use hearth_crawl::crawler::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(250));
/// assert_eq!(policy.backoff(0), Duration::from_millis(250));
/// assert_eq!(policy.backoff(1), Duration::from_millis(500));
/// assert_eq!(policy.backoff(2), Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts every attempt including the first; zero is treated as one
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the failed attempt numbered `attempt` (zero-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether another attempt follows the failed attempt numbered `attempt`
    pub fn has_attempt_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}
