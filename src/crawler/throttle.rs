//! Per-host crawl-delay throttling
//!
//! Each fetcher owns one [`HostThrottle`]. Components that must share a request
//! cadence share the fetcher, not a global.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Request timing for a single host
#[derive(Debug, Clone, Default)]
struct HostState {
    /// Start of the most recent request slot, or completion of the last successful fetch
    last_request_time: Option<Instant>,

    /// Number of slots handed out for this host
    request_count: u64,
}

impl HostState {
    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    fn time_until_next_request(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let ready_at = last.checked_add(min_delay)?;
        let wait = ready_at.saturating_duration_since(now);
        (!wait.is_zero()).then_some(wait)
    }
}

/// Tracks the last request per host and spaces requests by a crawl delay
#[derive(Debug, Default)]
pub struct HostThrottle {
    hosts: Mutex<HashMap<String, HostState>>,
}

impl HostThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next request slot for `host` and returns how long to wait for it
    ///
    /// Computing the wait and recording the slot happen under one lock, so
    /// concurrent callers for the same host receive successive slots spaced by
    /// `min_delay` instead of all passing the check at once.
    pub fn reserve(&self, host: &str, min_delay: Duration) -> Duration {
        let now = Instant::now();
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        let state = hosts.entry(host.to_string()).or_default();

        let wait = state
            .time_until_next_request(min_delay, now)
            .unwrap_or(Duration::ZERO);
        state.last_request_time = Some(now.checked_add(wait).unwrap_or(now));
        state.request_count += 1;
        wait
    }

    /// Records a successful fetch completing now
    ///
    /// Later slots are measured from whichever is later: this completion or an
    /// already reserved slot.
    pub fn record_success(&self, host: &str) {
        let now = Instant::now();
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        let state = hosts.entry(host.to_string()).or_default();
        state.last_request_time = Some(match state.last_request_time {
            Some(last) if last > now => last,
            _ => now,
        });
    }

    /// Timestamp the next crawl-delay computation for `host` is measured from
    pub fn last_request_time(&self, host: &str) -> Option<Instant> {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .and_then(|s| s.last_request_time)
    }

    /// Number of throttled request slots handed out for `host`
    pub fn request_count(&self, host: &str) -> u64 {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .map_or(0, |s| s.request_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "https://example.com";

    #[tokio::test(start_paused = true)]
    async fn test_first_request_not_delayed() {
        let throttle = HostThrottle::new();
        assert_eq!(throttle.reserve(HOST, Duration::from_secs(5)), Duration::ZERO);
        assert_eq!(throttle.request_count(HOST), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_waits_remaining_delay() {
        let throttle = HostThrottle::new();
        throttle.reserve(HOST, Duration::from_secs(5));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(throttle.reserve(HOST, Duration::from_secs(5)), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_delay_elapsed() {
        let throttle = HostThrottle::new();
        throttle.reserve(HOST, Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(throttle.reserve(HOST, Duration::from_secs(1)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_reservations_are_spaced() {
        let throttle = HostThrottle::new();
        let delay = Duration::from_secs(2);
        let waits: Vec<Duration> = (0..4).map(|_| throttle.reserve(HOST, delay)).collect();
        assert_eq!(
            waits,
            vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(6)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hosts_are_independent() {
        let throttle = HostThrottle::new();
        throttle.reserve(HOST, Duration::from_secs(5));
        assert_eq!(
            throttle.reserve("https://other.example.com", Duration::from_secs(5)),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_restarts_delay() {
        let throttle = HostThrottle::new();
        throttle.reserve(HOST, Duration::from_secs(2));

        // The request itself took 3 seconds
        tokio::time::advance(Duration::from_secs(3)).await;
        throttle.record_success(HOST);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(throttle.reserve(HOST, Duration::from_secs(2)), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_does_not_cancel_future_slot() {
        let throttle = HostThrottle::new();
        throttle.reserve(HOST, Duration::from_secs(10));
        throttle.reserve(HOST, Duration::from_secs(10)); // slot at +10s

        throttle.record_success(HOST);
        let last = throttle.last_request_time(HOST).unwrap();
        assert!(last >= Instant::now() + Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_host() {
        let throttle = HostThrottle::new();
        assert!(throttle.last_request_time(HOST).is_none());
        assert_eq!(throttle.request_count(HOST), 0);
    }
}
