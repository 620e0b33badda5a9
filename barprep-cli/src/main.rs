//! Barprep CLI: fill the bar cache and inspect it.
//!
//! Commands:
//! - `fetch`: acquire bars for a set of symbols and print the manifest
//! - `cache status`: list cached artifacts with their keys and sizes

use anyhow::{bail, Context, Result};
use barprep_core::data::{
    BarSize, CacheIndex, DataProvider, SpreadModel, SyntheticProvider, YahooProvider,
};
use barprep_core::{AcquireConfig, PathRegistry};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "barprep",
    about = "Barprep CLI: cached historical bars for backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch bars into the cache (reusing cached artifacts) and print the manifest.
    Fetch {
        /// Symbols to fetch (e.g., AAPL MSFT). Required unless --config is given.
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Bar size: 1m, 2m, 60m or 1d.
        #[arg(long)]
        bar_size: Option<BarSize>,

        /// Cache directory. Defaults to ./data.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// TOML config file; flags given on the command line take precedence.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use the offline synthetic provider instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Produce bid/ask columns with this half-spread, in basis points.
        #[arg(long)]
        spread_bps: Option<f64>,

        /// Fetch again even when an artifact is cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Print the manifest as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Cache inspection commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached artifacts with their keys and sizes.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

struct FetchArgs {
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    bar_size: Option<BarSize>,
    cache_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    spread_bps: Option<f64>,
    force: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            symbols,
            start,
            end,
            bar_size,
            cache_dir,
            config,
            synthetic,
            spread_bps,
            force,
            json,
        } => {
            let args = FetchArgs {
                symbols,
                start,
                end,
                bar_size,
                cache_dir,
                config,
                spread_bps,
                force,
            };
            run_fetch(args, synthetic, json)
        }
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn run_fetch(args: FetchArgs, synthetic: bool, json: bool) -> Result<()> {
    let config = resolve_config(args)?;

    let provider: Box<dyn DataProvider> = if synthetic {
        Box::new(SyntheticProvider::today())
    } else {
        Box::new(YahooProvider::new()?)
    };
    tracing::debug!(provider = provider.name(), "provider selected");

    let registry = config.acquisition(provider.as_ref())?.run()?;
    print_manifest(&registry, json)
}

/// Merge the optional config file with command-line flags; flags win.
fn resolve_config(args: FetchArgs) -> Result<AcquireConfig> {
    let mut config = match &args.config {
        Some(path) => AcquireConfig::from_file(path)?,
        None => {
            if args.symbols.is_empty() {
                bail!("no symbols given (pass SYMBOLS or --config)");
            }
            let (Some(start), Some(end)) = (&args.start, &args.end) else {
                bail!("--start and --end are required without --config");
            };
            AcquireConfig {
                cache_dir: PathBuf::from("data"),
                symbols: Vec::new(),
                start: start.clone(),
                end: end.clone(),
                bar_size: BarSize::default(),
                force_refresh: false,
                spread: None,
            }
        }
    };

    if !args.symbols.is_empty() {
        config.symbols = args.symbols;
    }
    if let Some(start) = args.start {
        config.start = start;
    }
    if let Some(end) = args.end {
        config.end = end;
    }
    if let Some(bar_size) = args.bar_size {
        config.bar_size = bar_size;
    }
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(half_spread_bps) = args.spread_bps {
        config.spread = Some(SpreadModel::new(half_spread_bps)?);
    }
    config.force_refresh |= args.force;

    // Surface request and spread errors before any provider is built.
    config.to_request()?;
    Ok(config)
}

fn print_manifest(registry: &PathRegistry, json: bool) -> Result<()> {
    if json {
        println!("{}", registry.to_json()?);
        return Ok(());
    }
    for entry in registry.entries() {
        println!("{:<8} {}", entry.symbol, entry.path.display());
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let artifacts = CacheIndex::new(cache_dir)
        .entries()
        .with_context(|| format!("listing {}", cache_dir.display()))?;

    if artifacts.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total_size: u64 = artifacts.iter().map(|a| a.size_bytes).sum();

    println!("Cache: {}", cache_dir.display());
    println!("Artifacts: {}", artifacts.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<8} {:<25} {:<5} {:<7} {:>10}",
        "Symbol", "Date Range", "Bars", "Schema", "Size"
    );
    println!("{}", "-".repeat(59));
    for artifact in &artifacts {
        let key = &artifact.key;
        println!(
            "{:<8} {:<25} {:<5} {:<7} {:>10}",
            key.symbol,
            format!("{} to {}", key.start, key.end),
            key.bar_size.to_string(),
            format!("{:?}", key.variant).to_lowercase(),
            format_size(artifact.size_bytes)
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
