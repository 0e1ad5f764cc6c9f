//! Per-origin robots.txt retrieval
//!
//! The provider fetches `/robots.txt` once per origin, caches the outcome and
//! serializes concurrent lookups for the same origin so only one request is in
//! flight. Every failure to obtain a document becomes
//! [`RobotsPolicy::Unavailable`], which allows everything.

use crate::cache::{KeyedLocks, TtlCache};
use crate::config::Config;
use crate::crawler::{FetchRequest, Transport};
use crate::robots::{ParseLimits, PolicyDocument, PolicyEvaluator, RobotsPolicy};
use crate::url::{origin_key, robots_url};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Fetches, parses and caches robots.txt documents per origin
pub struct RobotsProvider {
    transport: Arc<dyn Transport>,
    identity: String,
    evaluator: PolicyEvaluator,
    limits: ParseLimits,
    cache: TtlCache<RobotsPolicy>,
    fetch_locks: KeyedLocks,
    timeout: Duration,
    cache_ttl: Duration,
    unavailable_ttl: Duration,
}

impl std::fmt::Debug for RobotsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotsProvider")
            .field("identity", &self.identity)
            .field("evaluator", &self.evaluator)
            .field("cached_origins", &self.cache.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RobotsProvider {
    /// Creates a provider with default settings
    ///
    /// `identity` is sent as the `User-Agent` when fetching robots.txt.
    pub fn new(transport: Arc<dyn Transport>, identity: impl Into<String>) -> Self {
        Self::from_config(transport, &Config::default()).with_identity(identity)
    }

    /// Creates a provider from the loaded configuration
    pub fn from_config(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let robots = &config.robots;
        Self {
            transport,
            identity: config.user_agent.identity(),
            evaluator: PolicyEvaluator::new(robots.default_crawl_delay_secs),
            limits: ParseLimits {
                max_sitemaps: robots.max_sitemaps,
                max_rules_per_agent: robots.max_rules_per_agent,
            },
            cache: TtlCache::new(robots.cache_ttl()),
            fetch_locks: KeyedLocks::new(),
            timeout: config.fetcher.timeout(),
            cache_ttl: robots.cache_ttl(),
            unavailable_ttl: robots.unavailable_ttl(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Bounds each robots.txt request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.evaluator
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the policy governing `url`, fetching it on first use
    ///
    /// Never fails: anything that prevents obtaining a document yields
    /// [`RobotsPolicy::Unavailable`].
    pub async fn policy_for(&self, url: &Url) -> RobotsPolicy {
        let origin = match origin_key(url) {
            Ok(origin) => origin,
            Err(e) => return RobotsPolicy::unavailable(e.to_string()),
        };

        if let Some(policy) = self.cache.get(&origin) {
            return policy;
        }

        let _guard = self.fetch_locks.lock(&origin).await;

        // Another caller may have finished the fetch while we waited
        if let Some(policy) = self.cache.get(&origin) {
            return policy;
        }

        let policy = self.fetch_policy(url).await;
        let ttl = if policy.is_available() {
            self.cache_ttl
        } else {
            self.unavailable_ttl
        };
        self.cache.set(origin, policy.clone(), Some(ttl));
        policy
    }

    /// Checks whether `agent` may fetch `url`
    pub async fn is_allowed(&self, url: &Url, agent: &str) -> bool {
        let policy = self.policy_for(url).await;
        policy.is_allowed(&self.evaluator, agent, url.as_str())
    }

    /// Crawl delay for `agent` on the origin of `url`; `None` when no policy exists
    pub async fn crawl_delay_for(&self, url: &Url, agent: &str) -> Option<Duration> {
        let policy = self.policy_for(url).await;
        policy.crawl_delay(&self.evaluator, agent)
    }

    /// Sitemaps declared by the origin of `url`
    pub async fn sitemaps_for(&self, url: &Url) -> Vec<String> {
        self.policy_for(url).await.sitemaps().to_vec()
    }

    /// Drops the cached policy for the origin of `url`
    pub fn invalidate(&self, url: &Url) {
        if let Ok(origin) = origin_key(url) {
            self.cache.del(&origin);
        }
    }

    async fn fetch_policy(&self, url: &Url) -> RobotsPolicy {
        let robots = match robots_url(url) {
            Ok(robots) => robots,
            Err(e) => return RobotsPolicy::unavailable(e.to_string()),
        };

        tracing::info!("Fetching robots.txt: {}", robots);
        let request = FetchRequest::new(robots.clone(), self.identity.as_str());

        let response = match tokio::time::timeout(self.timeout, self.transport.get(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!("robots.txt unavailable for {}: {}", robots, e);
                return RobotsPolicy::unavailable(e.to_string());
            }
            Err(_) => {
                tracing::warn!("robots.txt request timed out after {:?}: {}", self.timeout, robots);
                return RobotsPolicy::unavailable(format!("timed out after {:?}", self.timeout));
            }
        };

        match response.status {
            200..=299 => match PolicyDocument::from_bytes(&response.body, &self.limits) {
                Ok(document) => {
                    let stats = document.stats();
                    tracing::debug!(
                        "Parsed robots.txt for {}: {} user-agents, {} rules, {} sitemaps",
                        robots,
                        stats.user_agents,
                        stats.total_rules,
                        stats.sitemaps
                    );
                    RobotsPolicy::fetched(document)
                }
                Err(e) => {
                    tracing::warn!("robots.txt for {} could not be parsed: {}", robots, e);
                    RobotsPolicy::unavailable(e.to_string())
                }
            },
            400..=499 => {
                tracing::debug!("robots.txt returned {} for {}, allowing all", response.status, robots);
                RobotsPolicy::fetched(PolicyDocument::default())
            }
            status => {
                tracing::warn!("robots.txt returned {} for {}", status, robots);
                RobotsPolicy::unavailable(format!("HTTP {}", status))
            }
        }
    }
}
