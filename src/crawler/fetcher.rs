//! Rate-limited HTTP fetcher
//!
//! This module handles every outbound page request, including:
//! - Robots.txt permission checks and crawl-delay waits
//! - Per-attempt timeouts
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::FetcherConfig;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::throttle::HostThrottle;
use crate::crawler::transport::{FetchRequest, FetchResponse, Transport, TransportError};
use crate::robots::RobotsProvider;
use crate::url::{origin_key, parse_http_url};
use crate::FetchError;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-call fetch settings
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Bound on each individual attempt
    pub timeout: Duration,

    /// Total number of attempts
    pub max_retries: u32,

    /// Backoff after the first failed attempt; doubles after each further failure
    pub backoff_base: Duration,

    /// Robots.txt source consulted before the first attempt
    pub policy: Option<Arc<RobotsProvider>>,

    /// Bypass permission checks and crawl delays even when `policy` is set
    pub ignore_robots_txt: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_base: Duration::from_millis(250),
            policy: None,
            ignore_robots_txt: false,
        }
    }
}

impl FetchOptions {
    /// Builds options from the `[fetcher]` configuration section
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base(),
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, provider: Arc<RobotsProvider>) -> Self {
        self.policy = Some(provider);
        self
    }

    pub fn ignoring_robots_txt(mut self, ignore: bool) -> Self {
        self.ignore_robots_txt = ignore;
        self
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_base)
    }

    /// The provider to consult, unless robots.txt is being ignored
    fn active_policy(&self) -> Option<&RobotsProvider> {
        if self.ignore_robots_txt {
            return None;
        }
        self.policy.as_deref()
    }
}

/// Fetches URLs politely
///
/// Crawl-delay spacing is tracked per fetcher instance. Components that must
/// share one request cadence per host must share the fetcher.
pub struct RateLimitedFetcher {
    transport: Arc<dyn Transport>,
    throttle: HostThrottle,
}

impl std::fmt::Debug for RateLimitedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedFetcher")
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

impl RateLimitedFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            throttle: HostThrottle::new(),
        }
    }

    /// The transport this fetcher sends requests through
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub fn throttle(&self) -> &HostThrottle {
        &self.throttle
    }

    /// Fetches `url` as `identity`
    ///
    /// # Request Flow
    ///
    /// 1. Parse the URL; a malformed URL fails immediately
    /// 2. If a policy is supplied and not ignored:
    ///    - refuse disallowed URLs
    ///    - wait out the crawl delay for the URL's origin
    /// 3. Attempt the request, each attempt bounded by `options.timeout`
    /// 4. On a retryable failure, back off and try again until attempts run out
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Any HTTP status | Returned as a response |
    /// | Timeout | Retry with backoff |
    /// | Connection/network error | Retry with backoff |
    /// | Invalid request | Immediate → `FetchError::Fatal` |
    /// | Attempts exhausted | `FetchError::Exhausted` with the last error |
    pub async fn fetch(
        &self,
        url: &str,
        identity: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        let target = parse_http_url(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = origin_key(&target).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(provider) = options.active_policy() {
            self.wait_for_policy(provider, &target, &host, identity).await?;
        }

        let request = FetchRequest::new(target, identity);
        let response = self.attempt_with_retries(&request, options).await?;
        self.throttle.record_success(&host);
        Ok(response)
    }

    /// Enforces the robots.txt verdict and crawl delay for `target`
    async fn wait_for_policy(
        &self,
        provider: &RobotsProvider,
        target: &Url,
        host: &str,
        identity: &str,
    ) -> Result<(), FetchError> {
        let policy = provider.policy_for(target).await;
        let evaluator = provider.evaluator();

        if !policy.is_allowed(evaluator, identity, target.as_str()) {
            tracing::info!("Disallowed by robots.txt: {}", target);
            return Err(FetchError::Disallowed {
                url: target.to_string(),
            });
        }

        if let Some(delay) = policy.crawl_delay(evaluator, identity) {
            let wait = self.throttle.reserve(host, delay);
            if !wait.is_zero() {
                tracing::debug!("Waiting {:?} before fetching {}", wait, target);
                tokio::time::sleep(wait).await;
            }
        }

        Ok(())
    }

    async fn attempt_with_retries(
        &self,
        request: &FetchRequest,
        options: &FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        let retry = options.retry_policy();
        let mut attempt = 0;

        loop {
            tracing::debug!(
                "Fetching {} (attempt {}/{})",
                request.url,
                attempt + 1,
                retry.max_attempts()
            );

            let error = match tokio::time::timeout(options.timeout, self.transport.get(request)).await {
                Ok(Ok(response)) => {
                    tracing::debug!("Fetched {} with status {}", request.url, response.status);
                    return Ok(response);
                }
                Ok(Err(e)) if !e.is_retryable() => {
                    tracing::error!("Fatal error fetching {}: {}", request.url, e);
                    return Err(FetchError::Fatal {
                        url: request.url.to_string(),
                        source: e,
                    });
                }
                Ok(Err(e)) => e,
                Err(_) => TransportError::Timeout(options.timeout),
            };

            if !retry.has_attempt_after(attempt) {
                tracing::error!(
                    "Giving up on {} after {} attempts: {}",
                    request.url,
                    attempt + 1,
                    error
                );
                return Err(FetchError::Exhausted {
                    url: request.url.to_string(),
                    attempts: attempt + 1,
                    source: error,
                });
            }

            let backoff = retry.backoff(attempt);
            tracing::warn!(
                "Attempt {} for {} failed: {}; retrying in {:?}",
                attempt + 1,
                request.url,
                error,
                backoff
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}
