//! Opencache - a terminal client for Opencaching geocache maps.
//!
//! Searches geocaches by bounding box, shows cache details, and `watch`
//! drives the same viewport fetch pipeline a map screen uses, reading map
//! bounds changes from stdin.

mod render;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opencache_core::viewport::{BoundsOutcome, FetchOutcome};
use opencache_core::{ApiClient, BoundingBox, Config, FetchOrchestrator, Geocache};

// ============================================================================
// Constants
// ============================================================================

/// Maximum concurrent detail requests for `show`.
/// Limits parallel requests to avoid overwhelming the server.
const MAX_CONCURRENT_REQUESTS: usize = 10;

/// Log file name used with `--log-file`
const LOG_FILE_NAME: &str = "opencache.log";

#[derive(Parser)]
#[command(name = "opencache", version, about = "Browse Opencaching geocaches from the terminal")]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to a daily file in the cache directory instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search a bounding box and retrieve full records (minLat|minLon|maxLat|maxLon)
    Search {
        #[arg(allow_hyphen_values = true)]
        bbox: BoundingBox,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Lightweight bounding box search
    Bbox {
        #[arg(allow_hyphen_values = true)]
        bbox: BoundingBox,
    },
    /// Show details for one or more caches
    Show {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Search around the configured home location
    Nearby {
        /// Box size in degrees
        #[arg(long, default_value_t = 0.1)]
        span: f64,
    },
    /// Read map bounds from stdin (one box per line, `-` for none) and
    /// keep a session cache the way a map screen does
    Watch,
    /// Print the effective configuration
    Config,
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
fn init_tracing(log_file: bool) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if log_file {
        let log_dir = Config::log_dir()?;
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
        let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .with(filter)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file)?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!(api_url = %config.api_url, "opencache starting");

    match cli.command {
        Command::Config => print_config(&config, cli.config.as_deref()),
        Command::Search { bbox, json } => search(&config, bbox, json).await,
        Command::Bbox { bbox } => search_light(&config, bbox).await,
        Command::Show { codes } => show(&config, codes).await,
        Command::Nearby { span } => {
            let bbox = BoundingBox::around(config.home, span, span);
            search(&config, bbox, false).await
        }
        Command::Watch => watch(&config).await,
    }
}

fn api_client(config: &Config) -> Result<ApiClient> {
    let settings = config.api_settings()?;
    ApiClient::new(settings).context("Failed to create API client")
}

fn sorted_by_code(mut caches: Vec<Geocache>) -> Vec<Geocache> {
    caches.sort_by(|a, b| a.code.cmp(&b.code));
    caches
}

fn print_config(config: &Config, path: Option<&std::path::Path>) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::config_path()?,
    };
    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}

async fn search(config: &Config, bbox: BoundingBox, json: bool) -> Result<()> {
    let client = api_client(config)?;
    let found = client
        .search_and_retrieve(&bbox)
        .await
        .with_context(|| format!("Search in {} failed", bbox))?;

    let caches = sorted_by_code(found.into_values().collect());
    if json {
        println!("{}", serde_json::to_string_pretty(&caches)?);
    } else {
        render::print_table(&caches);
    }
    Ok(())
}

async fn search_light(config: &Config, bbox: BoundingBox) -> Result<()> {
    let client = api_client(config)?;
    let caches = client
        .search_in_bounding_box(&bbox)
        .await
        .with_context(|| format!("Search in {} failed", bbox))?;
    render::print_table(&sorted_by_code(caches));
    Ok(())
}

async fn show(config: &Config, codes: Vec<String>) -> Result<()> {
    let client = api_client(config)?;

    let results: Vec<_> = stream::iter(codes)
        .map(|code| {
            let client = client.clone();
            async move {
                let result = client.get_geocache(&code).await;
                (code, result)
            }
        })
        .buffered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

    let mut failed = 0;
    for (i, (code, result)) in results.iter().enumerate() {
        if i > 0 {
            println!();
        }
        match result {
            Ok(cache) => render::print_detail(cache),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", code, e);
            }
        }
    }

    if failed == results.len() {
        anyhow::bail!("No geocache could be fetched");
    }
    Ok(())
}

async fn watch(config: &Config) -> Result<()> {
    let client = Arc::new(api_client(config)?);
    let mut orchestrator = FetchOrchestrator::new(client, config.sync_settings());

    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);
    orchestrator.set_failure_hook(move |bbox, error| {
        counter.fetch_add(1, Ordering::Relaxed);
        let retry = if error.is_transient() { " (move the map to retry)" } else { "" };
        eprintln!("fetch for {} failed: {}{}", bbox, error, retry);
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_bounds: Option<BoundingBox> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let bounds = match parse_bounds(&line) {
                    Ok(bounds) => bounds,
                    Err(e) => {
                        warn!(line = %line, error = %e, "Ignoring unparseable bounds");
                        eprintln!("{}", e);
                        continue;
                    }
                };
                if bounds.is_some() {
                    last_bounds = bounds;
                }
                match orchestrator.on_map_bounds_change(bounds) {
                    BoundsOutcome::Scheduled => println!("scheduled fetch"),
                    BoundsOutcome::Dropped => println!("dropped (too soon after last fetch)"),
                    BoundsOutcome::Ignored => {}
                }
            }
            Some(outcome) = orchestrator.process_next(), if orchestrator.has_pending() => {
                report(&orchestrator, &outcome, last_bounds.as_ref());
            }
        }
    }

    for outcome in orchestrator.settle().await {
        report(&orchestrator, &outcome, last_bounds.as_ref());
    }

    let store = orchestrator.store();
    println!(
        "session: {} geocaches cached, last update {}, {} failed fetch(es)",
        store.len(),
        store.age_display(),
        failures.load(Ordering::Relaxed)
    );
    Ok(())
}

/// `-` or an empty line means the map has no usable bounds.
fn parse_bounds(line: &str) -> Result<Option<BoundingBox>> {
    let line = line.trim();
    if line.is_empty() || line == "-" {
        return Ok(None);
    }
    Ok(Some(line.parse()?))
}

fn report(
    orchestrator: &FetchOrchestrator<ApiClient>,
    outcome: &FetchOutcome,
    viewport: Option<&BoundingBox>,
) {
    if let FetchOutcome::Merged { bbox, stats } = outcome {
        let store = orchestrator.store();
        let visible = viewport.map(|v| store.within(v).count()).unwrap_or(0);
        println!(
            "{}: {} new, {} updated; {} cached, {} in current view",
            bbox,
            stats.inserted,
            stats.updated,
            store.len(),
            visible
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse_bounds("").unwrap(), None);
        assert_eq!(parse_bounds(" - ").unwrap(), None);
        assert_eq!(
            parse_bounds("50|18|51|19").unwrap(),
            Some(BoundingBox::new(50.0, 18.0, 51.0, 19.0))
        );
        assert!(parse_bounds("50|18").is_err());
    }

    #[test]
    fn test_cli_parses_negative_bbox() {
        let cli = Cli::try_parse_from(["opencache", "search", "-1.5|-2|1|2"]).unwrap();
        match cli.command {
            Command::Search { bbox, json } => {
                assert_eq!(bbox, BoundingBox::new(-1.5, -2.0, 1.0, 2.0));
                assert!(!json);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_cli_show_requires_code() {
        assert!(Cli::try_parse_from(["opencache", "show"]).is_err());
        assert!(Cli::try_parse_from(["opencache", "show", "OP1", "OP2"]).is_ok());
    }
}
