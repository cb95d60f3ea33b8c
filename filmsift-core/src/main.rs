//! filmsift - classify a media catalog by external ratings
//!
//! Reads a JSON array of catalog items, resolves each against the rating
//! provider (through the local cache), classifies it and writes the ordered
//! rows as JSON. Provider trouble never fails the run; only unreadable input
//! or configuration does.

use anyhow::{bail, Context, Result};
use clap::Parser;
use filmsift_common::config::{load_config, TomlConfig};
use filmsift_core::cache::{CacheStore, WriteMode};
use filmsift_core::models::MediaItem;
use filmsift_core::provider::{Breaker, RateLimitedFetcher};
use filmsift_core::services::ClassificationPipeline;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for filmsift
#[derive(Parser, Debug)]
#[command(name = "filmsift")]
#[command(about = "Classify catalog items as KEEP / MAYBE / DELETE from external ratings")]
#[command(version)]
struct Args {
    /// JSON file with the catalog items
    #[arg(short, long)]
    items: PathBuf,

    /// Configuration file
    #[arg(short, long, env = "FILMSIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Cache file (overrides `cache_path`)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Output file for the classified rows (stdout when absent)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Never contact the provider; classify from the cache only
    #[arg(long)]
    offline: bool,

    /// Items resolved concurrently (overrides `concurrency`)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config loading logs through a temporary stderr subscriber
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(std::io::stderr)
        .finish();
    let mut config =
        tracing::subscriber::with_default(bootstrap, || load_config(args.config.as_deref()))
            .context("Failed to load configuration")?;

    apply_cli_overrides(&mut config, &args)?;
    init_tracing(&config)?;

    info!(
        "Starting filmsift v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let items = read_items(&args.items)?;
    info!(items = items.len(), source = %args.items.display(), "Catalog items loaded");

    let cache = Arc::new(CacheStore::open(config.resolved_cache_path(), WriteMode::WriteThrough));

    let breaker = if args.offline {
        info!("Offline mode: provider disabled, using local cache only");
        Arc::new(Breaker::opened())
    } else {
        Arc::new(Breaker::new())
    };
    let fetcher = Arc::new(RateLimitedFetcher::from_config(
        &config.provider,
        config.api_key(),
        breaker,
    ));

    let pipeline = ClassificationPipeline::from_config(&config, cache, fetcher);
    let rows = pipeline.classify_all(items).await;

    let json = serde_json::to_string_pretty(&rows).context("Failed to serialize results")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(rows = rows.len(), output = %path.display(), "Results written");
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut TomlConfig, args: &Args) -> Result<()> {
    if let Some(cache) = &args.cache {
        config.cache_path = Some(cache.clone());
    }
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            bail!("--concurrency must be at least 1");
        }
        config.concurrency = concurrency;
    }
    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let (writer, ansi) = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.logging.level))
        .with_writer(writer)
        .with_ansi(ansi)
        .init();

    Ok(())
}

fn read_items(path: &Path) -> Result<Vec<MediaItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read items file {}", path.display()))?;
    let items: Vec<MediaItem> = serde_json::from_str(&content)
        .with_context(|| format!("Items file {} is not a JSON array of items", path.display()))?;
    Ok(items)
}
