use crate::IDENTITY;
use hearth_crawl::config::{load_config, load_config_with_hash};
use hearth_crawl::crawler::FetchOptions;
use hearth_crawl::robots::RobotsProvider;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[fetcher]
timeout-ms = 5000
max-retries = 4
backoff-base-ms = 100

[robots]
ignore-robots-txt = true
default-crawl-delay-secs = 2.0
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_config_drives_fetch_options() {
    let file = write_config(CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.user_agent.identity(), IDENTITY);

    let options = FetchOptions::from_config(&config.fetcher)
        .ignoring_robots_txt(config.robots.ignore_robots_txt);
    assert_eq!(options.timeout, Duration::from_secs(5));
    assert_eq!(options.max_retries, 4);
    assert_eq!(options.backoff_base, Duration::from_millis(100));
    assert!(options.ignore_robots_txt);

    // Sections left out of the file keep their defaults
    assert_eq!(config.fetcher.max_concurrent, 4);
    assert_eq!(config.cache.standard_ttl_secs, 600);
}

#[test]
fn test_config_drives_robots_provider() {
    let file = write_config(CONFIG);
    let config = load_config(file.path()).unwrap();
    let provider = RobotsProvider::from_config(crate::transport(), &config);

    assert_eq!(provider.identity(), IDENTITY);
    assert_eq!(provider.evaluator().default_crawl_delay(), 2.0);
}

#[test]
fn test_hash_tracks_content() {
    let first = write_config(CONFIG);
    let second = write_config(&CONFIG.replace("max-retries = 4", "max-retries = 5"));

    let (_, hash_a) = load_config_with_hash(first.path()).unwrap();
    let (_, hash_b) = load_config_with_hash(first.path()).unwrap();
    let (_, hash_c) = load_config_with_hash(second.path()).unwrap();

    assert_eq!(hash_a, hash_b);
    assert_ne!(hash_a, hash_c);
    assert_eq!(hash_a.len(), 64);
}

#[test]
fn test_invalid_config_rejected() {
    let file = write_config("[fetcher]\nmax-retries = 0\n");
    assert!(load_config(file.path()).is_err());
}
