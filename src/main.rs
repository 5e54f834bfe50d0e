//! Webamber main entry point
//!
//! Command-line interface for the webamber site preservation crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use webamber::config::load_config_with_hash;
use webamber::crawler::crawl;

/// Webamber: a concurrent site preservation crawler
///
/// Webamber fetches a site with a pool of concurrent workers, follows the
/// links it finds, and mirrors every fetched page under an output
/// directory so the site can be browsed offline.
#[derive(Parser, Debug)]
#[command(name = "webamber")]
#[command(version)]
#[command(about = "A concurrent site preservation crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("loading configuration from {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("configuration loaded (hash: {})", hash);

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    crawl(config).await.context("crawl failed")?;

    tracing::info!("crawl completed");
    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else {
        match verbose {
            0 => EnvFilter::new("webamber=info,warn"),
            1 => EnvFilter::new("webamber=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Prints the effective configuration and seed summary without crawling
fn print_dry_run(config: &webamber::Config) {
    println!("=== Webamber Dry Run ===\n");

    println!("Crawl:");
    if let Some(url) = &config.crawl.url {
        println!("  Base URL: {}", url);
    }
    if let Some(sitemap) = &config.crawl.sitemap {
        println!("  Sitemap: {}", sitemap);
    }
    println!("  Explicit seeds: {}", config.crawl.seeds.len());
    for seed in &config.crawl.seeds {
        println!("    - {}", seed);
    }
    println!("  Workers: {}", config.crawl.workers);
    println!("  Delay: {:?}", config.crawl.delay);
    println!("  Same host only: {}", config.crawl.same_host_only);
    println!("  Retry failed: {}", config.crawl.retry_failed);

    println!("\nRequest:");
    println!("  User agent: {}", config.request.user_agent);
    if let Some(proxy) = &config.request.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\nOutput:");
    match &config.output.root {
        Some(root) => println!("  Root: {}", root),
        None => println!("  Root: (discard)"),
    }
    if let Some(stats) = &config.output.stats_path {
        println!("  Stats: {}", stats);
    }

    println!("\n✓ Configuration is valid");
}
