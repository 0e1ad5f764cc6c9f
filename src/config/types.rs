use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Hearth-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub fetcher: FetcherConfig,
    pub robots: RobotsConfig,
    pub cache: CacheConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the identity sent as the `User-Agent` header
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn identity(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "HearthCrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// Outbound request behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-attempt timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Total number of attempts per fetch
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles after every failed attempt (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Maximum number of fetches the CLI keeps in flight
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: u32,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            backoff_base_ms: 250,
            max_concurrent: 4,
        }
    }
}

/// Robots.txt handling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotsConfig {
    /// Skip robots.txt entirely: no permission checks, no crawl delay
    #[serde(rename = "ignore-robots-txt")]
    pub ignore_robots_txt: bool,

    /// How long a fetched policy document is reused (seconds)
    #[serde(rename = "cache-ttl-secs")]
    pub cache_ttl_secs: u64,

    /// How long an unreachable policy is remembered before refetching (seconds)
    #[serde(rename = "unavailable-ttl-secs")]
    pub unavailable_ttl_secs: u64,

    /// Delay used when a policy document declares no Crawl-delay (seconds)
    #[serde(rename = "default-crawl-delay-secs")]
    pub default_crawl_delay_secs: f64,

    /// Cap on the document-wide sitemap list
    #[serde(rename = "max-sitemaps")]
    pub max_sitemaps: usize,

    /// Cap on rules kept per user-agent group
    #[serde(rename = "max-rules-per-agent")]
    pub max_rules_per_agent: usize,
}

impl RobotsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn unavailable_ttl(&self) -> Duration {
        Duration::from_secs(self.unavailable_ttl_secs)
    }
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            ignore_robots_txt: false,
            cache_ttl_secs: 3600,
            unavailable_ttl_secs: 60,
            default_crawl_delay_secs: 1.0,
            max_sitemaps: 50,
            max_rules_per_agent: 1000,
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without one (seconds)
    #[serde(rename = "standard-ttl-secs")]
    pub standard_ttl_secs: u64,

    /// Interval of the background expiry sweep (seconds)
    #[serde(rename = "sweep-interval-secs")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn standard_ttl(&self) -> Duration {
        Duration::from_secs(self.standard_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            standard_ttl_secs: 600,
            sweep_interval_secs: 120,
        }
    }
}
