//! Crawler module for polite page fetching
//!
//! This module contains the outbound request path, including:
//! - The `Transport` seam and its reqwest implementation
//! - Retry with exponential backoff
//! - Per-host crawl-delay throttling
//! - The rate-limited fetcher tying them to robots.txt policies
//! - A response cache that collapses duplicate requests

mod cached;
mod fetcher;
mod retry;
mod throttle;
mod transport;

pub use cached::{CachedFetcher, ResponseSource};
pub use fetcher::{FetchOptions, RateLimitedFetcher};
pub use retry::RetryPolicy;
pub use throttle::HostThrottle;
pub use transport::{
    build_http_client, FetchRequest, FetchResponse, ReqwestTransport, Transport, TransportError,
};
