use crate::config::types::{CacheConfig, Config, FetcherConfig, RobotsConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_robots_config(&config.robots)?;
    validate_cache_config(&config.cache)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 1 || config.timeout_ms > 300_000 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be between 1 and 300000, got {}",
            config.timeout_ms
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.backoff_base_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "backoff_base_ms must be <= 60000ms, got {}ms",
            config.backoff_base_ms
        )));
    }

    if config.max_concurrent < 1 || config.max_concurrent > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 64, got {}",
            config.max_concurrent
        )));
    }

    Ok(())
}

/// Validates robots.txt configuration
fn validate_robots_config(config: &RobotsConfig) -> Result<(), ConfigError> {
    if !config.default_crawl_delay_secs.is_finite() || config.default_crawl_delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "default_crawl_delay_secs must be a non-negative number, got {}",
            config.default_crawl_delay_secs
        )));
    }

    if config.cache_ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "cache_ttl_secs must be >= 1".to_string(),
        ));
    }

    if config.max_sitemaps < 1 {
        return Err(ConfigError::Validation(
            "max_sitemaps must be >= 1".to_string(),
        ));
    }

    if config.max_rules_per_agent < 1 {
        return Err(ConfigError::Validation(
            "max_rules_per_agent must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates result cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.standard_ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "standard_ttl_secs must be >= 1".to_string(),
        ));
    }

    if config.sweep_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "sweep_interval_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let (local, domain) = match email.split_once('@') {
        Some(parts) if !parts.1.contains('@') => parts,
        _ => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
