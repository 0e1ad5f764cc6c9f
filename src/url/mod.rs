//! URL handling module for Hearth-Crawl
//!
//! This module provides URL parsing for outbound requests, origin keys for
//! per-host state, robots.txt location, and the path form used for rule matching.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::origin_key;

/// Parses a URL that the fetcher is allowed to request
///
/// Only absolute `http` and `https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use hearth_crawl::url::parse_http_url;
///
/// assert!(parse_http_url("https://example.com/homes/").is_ok());
/// assert!(parse_http_url("ftp://example.com/").is_err());
/// assert!(parse_http_url("/relative/path").is_err());
/// ```
pub fn parse_http_url(input: &str) -> UrlResult<Url> {
    let url = Url::parse(input).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Returns the robots.txt URL governing the given URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use hearth_crawl::url::robots_url;
///
/// let url = Url::parse("https://example.com/homes/detail/123_zpid/").unwrap();
/// assert_eq!(robots_url(&url).unwrap().as_str(), "https://example.com/robots.txt");
/// ```
pub fn robots_url(url: &Url) -> UrlResult<Url> {
    let origin = origin_key(url)?;
    Url::parse(&format!("{}/robots.txt", origin)).map_err(|e| UrlError::Parse(e.to_string()))
}

/// Reduces a URL or path to the form robots.txt rules are matched against
///
/// Absolute URLs become their path plus query string (`/a/b?x=1`); anything else is
/// treated as a path and gains a leading `/` when missing. Fragments never take part.
///
/// # Examples
///
/// ```
/// use hearth_crawl::url::matchable_path;
///
/// assert_eq!(matchable_path("https://example.com/search?q=1#top"), "/search?q=1");
/// assert_eq!(matchable_path("/private/secret"), "/private/secret");
/// assert_eq!(matchable_path("homes"), "/homes");
/// ```
pub fn matchable_path(input: &str) -> String {
    if let Ok(url) = Url::parse(input) {
        if url.has_host() {
            return match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            };
        }
    }

    let path = input.split('#').next().unwrap_or_default();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
