//! Sitegrep main entry point
//!
//! This is the command-line interface for the Sitegrep search service.

use clap::Parser;
use sitegrep::config::{parse_config, validate, Config};
use sitegrep::ConfigError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sitegrep: keyword search over a single site
///
/// Sitegrep serves an HTTP API that starts breadth-first crawls of the
/// configured site and reports the pages whose text contains a keyword.
#[derive(Parser, Debug)]
#[command(name = "sitegrep")]
#[command(version)]
#[command(about = "Asynchronous keyword search over a single site", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the crawl base URL from the config file
    #[arg(long, env = "BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Override the listen address from the config file
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Validate config and print the effective settings without serving
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, apply overrides, then validate
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_with_overrides(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        print_settings(&config);
        return Ok(());
    }

    sitegrep::server::run(config).await
}

/// Reads the config file and applies command-line overrides before validating
fn load_with_overrides(cli: &Cli) -> sitegrep::Result<Config> {
    let contents = std::fs::read_to_string(&cli.config).map_err(ConfigError::Io)?;
    let mut config = parse_config(&contents)?;

    if let Some(base_url) = &cli.base_url {
        config.crawler.base_url = base_url.clone();
    }
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
    }

    validate(&config)?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitegrep=info,warn"),
            1 => EnvFilter::new("sitegrep=debug,info"),
            2 => EnvFilter::new("sitegrep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode
fn print_settings(config: &Config) {
    println!("=== Sitegrep Dry Run ===\n");

    println!("Crawler:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Max results: {}", config.crawler.max_results);
    println!("  Max retries: {} ({:?})", config.crawler.max_retries, config.crawler.retry_policy);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Max queue size: {}", config.crawler.max_queue_size);

    println!("\nCircuit breaker:");
    println!("  Threshold: {}", config.circuit_breaker.threshold);
    println!("  Cooldown: {}s", config.circuit_breaker.cooldown_secs);

    println!("\nRunner:");
    println!("  Max concurrent searches: {}", config.runner.max_concurrent_searches);
    println!("  Shutdown grace: {}s", config.runner.shutdown_grace_secs);

    println!("\nServer:");
    println!("  Listen: {}", config.server.listen_addr);
    match config.registry.retention_secs {
        Some(secs) => println!("  Evict finished searches after {}s", secs),
        None => println!("  Finished searches are kept until exit"),
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\n✓ Configuration is valid");
}
