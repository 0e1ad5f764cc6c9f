//! Hearth-Crawl: a polite fetch layer for listing sites
//!
//! This crate implements the crawling core a scraping front end sits on:
//! robots.txt parsing and evaluation, per-host crawl-delay throttling, a retrying
//! HTTP fetcher, and an in-memory TTL cache for policies and fetched results.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod robots;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Hearth-Crawl operations
#[derive(Debug, Error)]
pub enum HearthError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Robots.txt error: {0}")]
    Policy(#[from] robots::PolicyError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Errors surfaced by [`crawler::RateLimitedFetcher::fetch`]
///
/// `InvalidUrl`, `Disallowed` and `Fatal` are raised before or instead of the retry
/// loop; `Exhausted` is raised once every attempt has failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL disallowed by robots.txt: {url}")]
    Disallowed { url: String },

    #[error("Request to {url} failed: {source}")]
    Fatal {
        url: String,
        #[source]
        source: crawler::TransportError,
    },

    #[error("Request to {url} failed after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: crawler::TransportError,
    },
}

impl FetchError {
    /// Returns the last transport error, if the failure came from the network
    pub fn transport_error(&self) -> Option<&crawler::TransportError> {
        match self {
            Self::Fatal { source, .. } | Self::Exhausted { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for Hearth-Crawl operations
pub type Result<T> = std::result::Result<T, HearthError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Header value sent as `Accept-Language` on every outbound request
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Crawl delay applied when a policy document declares none
pub const DEFAULT_CRAWL_DELAY: Duration = Duration::from_secs(1);

// Re-export commonly used types
pub use cache::{cache_key, generate_cache_key, TtlCache};
pub use config::Config;
pub use crawler::{FetchOptions, FetchResponse, RateLimitedFetcher};
pub use robots::{PolicyDocument, PolicyEvaluator, RobotsPolicy, RobotsProvider};
