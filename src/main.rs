//! Hearth-Crawl main entry point
//!
//! This is the command-line interface for the Hearth-Crawl fetch layer.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hearth_crawl::cache::TtlCache;
use hearth_crawl::config::{load_config_with_hash, validate, Config};
use hearth_crawl::crawler::{
    CachedFetcher, FetchOptions, RateLimitedFetcher, ReqwestTransport, ResponseSource, Transport,
};
use hearth_crawl::robots::{RobotsPolicy, RobotsProvider};
use hearth_crawl::url::{matchable_path, origin_key, parse_http_url};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

/// Hearth-Crawl: a polite fetch layer
///
/// Hearth-Crawl fetches pages while respecting robots.txt rules and crawl
/// delays, retrying transient failures with exponential backoff.
#[derive(Parser, Debug)]
#[command(name = "hearth-crawl")]
#[command(version)]
#[command(about = "A polite fetch layer for listing sites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one or more URLs through a shared rate-limited fetcher
    Fetch {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Skip robots.txt permission checks and crawl delays
        #[arg(long)]
        ignore_robots_txt: bool,
    },

    /// Report whether a URL may be fetched and the crawl delay for its host
    Check {
        #[arg(value_name = "URL")]
        url: String,

        /// User-agent to evaluate (defaults to the configured identity)
        #[arg(long)]
        agent: Option<String>,
    },

    /// Show the robots.txt summary for a URL's origin
    Robots {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_ref())?;
    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new().context("failed to build HTTP client")?);
    let provider = Arc::new(RobotsProvider::from_config(Arc::clone(&transport), &config));

    match cli.command {
        Command::Fetch {
            urls,
            ignore_robots_txt,
        } => handle_fetch(&config, transport, provider, urls, ignore_robots_txt).await?,
        Command::Check { url, agent } => {
            let agent = agent.unwrap_or_else(|| config.user_agent.identity());
            handle_check(&provider, &url, &agent).await?
        }
        Command::Robots { url } => handle_robots(&provider, &url).await?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hearth_crawl=info,warn"),
            1 => EnvFilter::new("hearth_crawl=debug,info"),
            2 => EnvFilter::new("hearth_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration file, or validated defaults when none is given
fn load_configuration(path: Option<&PathBuf>) -> hearth_crawl::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Handles the `fetch` command
async fn handle_fetch(
    config: &Config,
    transport: Arc<dyn Transport>,
    provider: Arc<RobotsProvider>,
    urls: Vec<String>,
    ignore_robots_txt: bool,
) -> anyhow::Result<()> {
    let ignore = ignore_robots_txt || config.robots.ignore_robots_txt;
    if ignore {
        tracing::warn!("Ignoring robots.txt: no permission checks or crawl delays");
    }

    let identity = Arc::new(config.user_agent.identity());
    let options = Arc::new(
        FetchOptions::from_config(&config.fetcher)
            .with_policy(provider)
            .ignoring_robots_txt(ignore),
    );
    let fetcher = Arc::new(CachedFetcher::new(
        Arc::new(RateLimitedFetcher::new(transport)),
        TtlCache::from_config(&config.cache),
    ));
    let _sweeper = fetcher.responses().spawn_sweeper(config.cache.sweep_interval());
    let permits = Arc::new(Semaphore::new(config.fetcher.max_concurrent as usize));

    let total = urls.len();
    let mut tasks = Vec::with_capacity(total);
    for url in urls {
        let identity = Arc::clone(&identity);
        let options = Arc::clone(&options);
        let fetcher = Arc::clone(&fetcher);
        let permits = Arc::clone(&permits);

        tasks.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let (response, source) = fetcher.fetch(&url, &identity, &options).await?;
            anyhow::Ok((url, response, source == ResponseSource::Cache))
        }));
    }

    let mut failed = 0;
    for task in tasks {
        match task.await? {
            Ok((url, response, cached)) => {
                println!(
                    "{} {} ({} bytes{}) {}",
                    response.status,
                    url,
                    response.body.len(),
                    if cached { ", cached" } else { "" },
                    response.content_type.as_deref().unwrap_or("-")
                );
            }
            Err(e) => {
                failed += 1;
                tracing::error!("{:#}", e);
                println!("ERR {}", e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} fetches failed", failed, total);
    }
    Ok(())
}

/// Handles the `check` command
async fn handle_check(provider: &RobotsProvider, url: &str, agent: &str) -> hearth_crawl::Result<()> {
    let target = parse_http_url(url)?;
    let policy = provider.policy_for(&target).await;
    let evaluator = provider.evaluator();
    let path = matchable_path(target.as_str());

    let verdict = if policy.is_allowed(evaluator, agent, &path) {
        "allowed"
    } else {
        "disallowed"
    };
    println!("{} {} for {}", target, verdict, agent);

    match &policy {
        RobotsPolicy::Fetched { document, .. } => {
            if let Some(rule) = evaluator.deciding_rule(document, agent, &path) {
                println!("  Rule: {:?} {}", rule.kind(), rule.pattern());
            } else {
                println!("  Rule: none matched");
            }
        }
        RobotsPolicy::Unavailable { reason } => {
            println!("  robots.txt unavailable ({}), allowing all", reason);
        }
    }

    match policy.crawl_delay(evaluator, agent) {
        Some(delay) => println!("  Crawl delay: {:?}", delay),
        None => println!("  Crawl delay: none"),
    }

    Ok(())
}

/// Handles the `robots` command
async fn handle_robots(provider: &RobotsProvider, url: &str) -> hearth_crawl::Result<()> {
    let target = parse_http_url(url)?;
    let origin = origin_key(&target)?;
    let policy = provider.policy_for(&target).await;

    println!("=== robots.txt for {} ===\n", origin);

    let Some(document) = policy.document() else {
        if let RobotsPolicy::Unavailable { reason } = &policy {
            println!("Unavailable: {}", reason);
        }
        println!("All paths allowed, no crawl delay");
        return Ok(());
    };

    let stats = document.stats();
    println!("User-agents: {}", stats.user_agents);
    println!("Rules: {}", stats.total_rules);
    println!("User-agents with crawl delay: {}", stats.user_agents_with_crawl_delay);

    for group in document.groups() {
        match group.crawl_delay() {
            Some(delay) => println!("  - {} ({} rules, delay {}s)", group.agent(), group.rules().len(), delay),
            None => println!("  - {} ({} rules)", group.agent(), group.rules().len()),
        }
    }

    println!("\nSitemaps ({}):", stats.sitemaps);
    for sitemap in policy.sitemaps() {
        println!("  - {}", sitemap);
    }

    Ok(())
}
