//! Hadith-Harvest main entry point
//!
//! This is the command-line interface for the Hadith-Harvest collector.

use clap::Parser;
use hadith_harvest::config::{load_config_with_hash, Config, StoreBackend};
use hadith_harvest::harvest::run_harvest;
use hadith_harvest::store::{self, HadithStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Hadith-Harvest: a paginating hadith collector
///
/// Hadith-Harvest opens the configured listing page in a headless browser,
/// stores every complete hadith panel as a row, and follows the "next page"
/// link until the collection ends.
#[derive(Parser, Debug)]
#[command(name = "hadith-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A paginating hadith collector", long_about = None)]
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

    /// Validate config and show what would be harvested without launching a browser
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show how many rows the store holds for the configured book and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list"])]
    stats: bool,

    /// Print one page of the configured book's stored rows as JSON and exit
    #[arg(long, conflicts_with = "dry_run")]
    list: bool,

    /// Rows to skip before the printed page (with --list)
    #[arg(long, default_value_t = 0, requires = "list")]
    offset: u32,

    /// Rows per printed page (with --list)
    #[arg(
        long,
        default_value_t = 5,
        requires = "list",
        value_parser = clap::value_parser!(u32).range(1..=1000)
    )]
    limit: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config).await?;
    } else if cli.list {
        handle_list(&config, cli.offset, cli.limit).await?;
    } else {
        handle_harvest(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hadith_harvest=info,warn"),
            1 => EnvFilter::new("hadith_harvest=debug,info"),
            2 => EnvFilter::new("hadith_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Hadith-Harvest Dry Run ===\n");

    println!("Harvest:");
    println!("  Entrypoint: {}", config.harvest.entrypoint);
    println!("  Book id: {}", config.harvest.book_id);
    println!(
        "  Selector timeout: {}ms",
        config.harvest.selector_timeout_ms
    );

    println!("\nSelectors:");
    println!("  Panel: {}", config.selectors.panel);
    println!("  Header: {}", config.selectors.header);
    println!("  Arabic: {}", config.selectors.arabic);
    println!("  Translation: {}", config.selectors.translation);
    println!("  Next page: {}", config.selectors.next);

    println!("\nStore:");
    match config.store.backend {
        StoreBackend::Postgres => println!(
            "  postgres://{}@{}:{}/{}",
            config.store.user, config.store.host, config.store.port, config.store.database
        ),
        StoreBackend::Sqlite => println!("  sqlite://{}", config.store.database),
    }
    println!("  Table: {}", config.store.table);

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    if let Some(executable) = &config.browser.executable {
        println!("  Executable: {}", executable);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows the row count for the configured book
async fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = store::connect(&config.store).await?;
    let count = store.count_by_book(config.harvest.book_id).await?;
    store.close().await?;

    println!("Table: {}", config.store.table);
    println!("Rows for book {}: {}", config.harvest.book_id, count);

    Ok(())
}

/// Handles the --list mode: prints a page of stored rows
async fn handle_list(
    config: &Config,
    offset: u32,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = store::connect(&config.store).await?;
    let page = store
        .find_by_book(config.harvest.book_id, offset, limit)
        .await?;
    store.close().await?;

    tracing::debug!(
        "Read {} of {} rows for book {}",
        page.items.len(),
        page.total,
        page.book_id
    );
    println!("{}", serde_json::to_string_pretty(&page)?);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Harvesting book {} starting at {}",
        config.harvest.book_id,
        config.harvest.entrypoint
    );

    match run_harvest(config).await {
        Ok(stats) => {
            tracing::info!(
                "Harvest finished: {} pages, {} rows",
                stats.pages,
                stats.rows_inserted
            );
            Ok(())
        }
        Err(e) if e.is_connectivity() => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
