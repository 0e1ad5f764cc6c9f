//! Integration tests for the fetch layer
//!
//! These tests use wiremock to create mock HTTP servers and exercise robots.txt
//! handling and the rate-limited fetcher end-to-end over real HTTP.

mod config_tests;
mod fetch_tests;
mod robots_tests;

use hearth_crawl::config::Config;
use hearth_crawl::crawler::{FetchOptions, RateLimitedFetcher, ReqwestTransport, Transport};
use hearth_crawl::robots::RobotsProvider;
use std::sync::Arc;
use std::time::Duration;

/// Identity sent by the test crawler
pub const IDENTITY: &str = "TestBot/1.0 (+https://example.com/contact; test@example.com)";

pub fn transport() -> Arc<dyn Transport> {
    Arc::new(ReqwestTransport::new().expect("Failed to build HTTP client"))
}

/// A configuration with short timeouts and backoff for testing
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0".to_string();
    config.user_agent.contact_url = "https://example.com/contact".to_string();
    config.user_agent.contact_email = "test@example.com".to_string();
    config.fetcher.timeout_ms = 2_000;
    config.fetcher.backoff_base_ms = 10;
    config
}

/// A fetcher and robots-aware options sharing one transport
pub fn polite_fetcher(config: &Config) -> (RateLimitedFetcher, FetchOptions) {
    let transport = transport();
    let provider = RobotsProvider::from_config(Arc::clone(&transport), config);
    let options = FetchOptions::from_config(&config.fetcher).with_policy(Arc::new(provider));
    (RateLimitedFetcher::new(transport), options)
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
