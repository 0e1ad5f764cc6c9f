//! Response caching in front of the rate-limited fetcher
//!
//! Repeated requests for the same URL and identity are answered from a
//! [`TtlCache`]. Concurrent requests for one key share a single network fetch:
//! the first caller fetches while the rest wait on the key, then read the
//! cached response.

use super::{FetchOptions, FetchResponse, RateLimitedFetcher};
use crate::cache::{generate_cache_key, KeyedLocks, TtlCache};
use crate::FetchError;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Where a [`CachedFetcher`] response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

#[derive(Debug)]
pub struct CachedFetcher {
    fetcher: Arc<RateLimitedFetcher>,
    responses: Arc<TtlCache<FetchResponse>>,
    in_flight: KeyedLocks,
}

impl CachedFetcher {
    pub fn new(fetcher: Arc<RateLimitedFetcher>, responses: TtlCache<FetchResponse>) -> Self {
        Self {
            fetcher,
            responses: Arc::new(responses),
            in_flight: KeyedLocks::new(),
        }
    }

    /// The response cache, e.g. for attaching a sweeper
    pub fn responses(&self) -> &Arc<TtlCache<FetchResponse>> {
        &self.responses
    }

    /// Fetches `url` as `identity`, or returns the cached response
    ///
    /// Failed fetches are not cached; a waiting caller whose leader failed
    /// makes its own attempt.
    pub async fn fetch(
        &self,
        url: &str,
        identity: &str,
        options: &FetchOptions,
    ) -> Result<(FetchResponse, ResponseSource), FetchError> {
        let key = response_key(url, identity);
        if let Some(response) = self.responses.get(&key) {
            return Ok((response, ResponseSource::Cache));
        }

        let _guard = self.in_flight.lock(&key).await;
        if let Some(response) = self.responses.get(&key) {
            return Ok((response, ResponseSource::Cache));
        }

        let response = self.fetcher.fetch(url, identity, options).await?;
        self.responses.set(key, response.clone(), None);
        Ok((response, ResponseSource::Network))
    }
}

fn response_key(url: &str, identity: &str) -> String {
    let mut params = Map::new();
    params.insert("url".to_string(), Value::String(url.to_string()));
    params.insert("identity".to_string(), Value::String(identity.to_string()));
    generate_cache_key(&params)
}
