//! Sitemap-Hunter main entry point
//!
//! This is the command-line interface for the Sitemap-Hunter crawler.

use anyhow::Context;
use clap::Parser;
use sitemap_hunter::config::{load_config_with_hash, load_seed_list, Config};
use sitemap_hunter::crawler::{order_domains, run_crawl, RunSummary};
use sitemap_hunter::output::{load_statistics, print_statistics};
use sitemap_hunter::storage::{open_storage, StateStore};
use sitemap_hunter::url::Domain;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Sitemap-Hunter: A resumable, polite sitemap crawler
///
/// Sitemap-Hunter discovers each domain's sitemaps through robots.txt,
/// walks sitemap indexes breadth-first and stores every sitemap document
/// on disk, resuming where the previous run stopped.
#[derive(Parser, Debug)]
#[command(name = "sitemap-hunter")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, polite sitemap crawler", long_about = None)]
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

    /// Discard every domain checkpoint before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the domain order without crawling
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show statistics from the state directory and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.stats {
        return handle_stats(&config).await;
    }

    let seed_path = Path::new(&config.output.seed_list);
    let domains = load_seed_list(seed_path)
        .with_context(|| format!("failed to read seed list {}", seed_path.display()))?;
    if domains.is_empty() {
        tracing::warn!("Seed list {} contains no domains", seed_path.display());
    }

    if cli.dry_run {
        handle_dry_run(&config, &domains).await
    } else {
        handle_crawl(config, domains, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` overrides the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "sitemap_hunter=info,warn",
            1 => "sitemap_hunter=debug,info",
            2 => "sitemap_hunter=trace,debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the crawl order
async fn handle_dry_run(config: &Config, domains: &[Domain]) -> anyhow::Result<()> {
    println!("=== Sitemap-Hunter Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Pool size: {}", config.crawler.pool_size);
    println!(
        "  Delay: {}..{}ms (+{}ms jitter)",
        config.crawler.min_delay_ms, config.crawler.max_delay_ms, config.crawler.jitter_ms
    );
    println!("  Retry ceiling: {}", config.crawler.retry_ceiling);
    println!("  Breaker threshold: {}", config.crawler.breaker_threshold);

    println!("\nBudget:");
    println!("  Time: {}s", config.budget.time_budget_secs);
    println!("  Files per run: {}", config.budget.max_files_per_run);
    println!("  Free disk floor: {}MB", config.budget.min_free_disk_mb);

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Data directory: {}", config.output.data_dir);

    let (store, _) = open_storage(Path::new(&config.output.data_dir))
        .context("failed to open data directory")?;
    let stats = store.load_global().await?;
    let ordered = order_domains(domains, &stats);

    println!("\nDomains in crawl order ({}):", ordered.len());
    for domain in &ordered {
        let last = stats
            .last_crawled_at(domain.key())
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never crawled".to_string());
        println!("  - {} ({})", domain, last);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the state directory
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Data directory: {}\n", config.output.data_dir);

    let (store, _) = open_storage(Path::new(&config.output.data_dir))
        .context("failed to open data directory")?;
    let stats = load_statistics(&store).await?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, domains: Vec<Domain>, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding checkpoints)");
    } else {
        tracing::info!("Starting crawl (resuming from checkpoints where present)");
    }
    tracing::info!("Seed domains: {}", domains.len());

    let summary = run_crawl(config, domains, fresh).await?;
    print_run_summary(&summary);

    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    println!("\n=== Run Summary ===");
    for (key, report) in &summary.domains {
        println!(
            "  {}: {} ({} fetched, {} downloaded, {} unchanged, {} errors)",
            key,
            report.status,
            report.attempted,
            report.downloaded,
            report.not_modified,
            report.errors
        );
    }
    for key in &summary.failed {
        println!("  {}: failed", key);
    }
    if let Some(reason) = summary.stopped {
        println!("Stopped early: {}", reason);
    }
    println!(
        "{} file(s) in {:.1}s",
        summary.files_processed,
        summary.elapsed.as_secs_f64()
    );
}
