//! Configuration module for Hearth-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so a missing file section still yields a usable config.
//!
//! # Example
//!
//! ```no_run
//! use hearth_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("hearth.toml")).unwrap();
//! println!("Fetcher will retry {} times", config.fetcher.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, Config, FetcherConfig, RobotsConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
