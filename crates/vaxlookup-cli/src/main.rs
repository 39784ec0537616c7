//! vaxlookup - look up vaccines, their clinical trials, and adverse effects.
//!
//! Reads from a PostgREST vaccine database (or a JSON export of it) and
//! keeps recently viewed vaccine details in a local cache.

mod output;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vaxlookup_core::{
    Config, DataSource, FileStorage, LookupService, RestClient, SnapshotSource, SystemClock,
    VaccineCache,
};

const USAGE: &str = "\
Usage: vaxlookup [--json] [--log-file <path>] <command>

Commands:
  list              List all vaccines by category
  show <id>         Show a vaccine with its clinical trials and adverse effects
  stats             Show database totals and recently added vaccines
  search <term>     Find vaccines by name, manufacturer, or description
  cache status      Show detail cache size and age
  cache clear       Empty the detail cache
  cache prune       Empty the detail cache if it has expired

Environment:
  VAXLOOKUP_API_URL    PostgREST project URL
  VAXLOOKUP_API_KEY    API key sent with REST requests
  VAXLOOKUP_SNAPSHOT   JSON export file or directory to use instead of the API
  RUST_LOG             Log filter (default: warn)";

#[derive(Debug, PartialEq)]
enum Command {
    List,
    Show(i64),
    Stats,
    Search(String),
    CacheStatus,
    CacheClear,
    CachePrune,
    Help,
}

#[derive(Debug, PartialEq)]
struct Args {
    command: Command,
    json: bool,
    log_file: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut json = false;
    let mut log_file = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--log-file" => {
                let path = iter.next().context("--log-file needs a path")?;
                log_file = Some(PathBuf::from(path));
            }
            "-h" | "--help" => positional = vec!["help"],
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        [] | ["help"] => Command::Help,
        ["list"] => Command::List,
        ["show", id] => Command::Show(
            id.parse()
                .with_context(|| format!("Invalid vaccine id: {}", id))?,
        ),
        ["stats"] => Command::Stats,
        ["search", terms @ ..] if !terms.is_empty() => Command::Search(terms.join(" ")),
        ["cache", "status"] => Command::CacheStatus,
        ["cache", "clear"] => Command::CacheClear,
        ["cache", "prune"] => Command::CachePrune,
        other => bail!("Unrecognized command: {}\n\n{}", other.join(" "), USAGE),
    };

    Ok(Args {
        command,
        json,
        log_file,
    })
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_cache(config: &Config) -> Result<Arc<VaccineCache>> {
    let dir = config.cache_dir()?;
    let storage = FileStorage::new(dir.clone())
        .with_context(|| format!("Failed to open cache directory {}", dir.display()))?;
    Ok(Arc::new(VaccineCache::new(
        Arc::new(storage),
        Arc::new(SystemClock),
        config.cache_settings(),
    )))
}

fn run_cache_command(command: &Command, cache: &VaccineCache, json: bool) -> Result<()> {
    match command {
        Command::CacheClear => {
            cache.clear();
            if !json {
                println!("Cache cleared");
            }
        }
        Command::CachePrune => {
            let cleared = cache.clear_expired();
            if !json {
                println!("{}", if cleared { "Expired cache cleared" } else { "Cache is fresh" });
            }
        }
        _ => {}
    }

    let status = cache.status();
    if json {
        print_json(&status)
    } else {
        if matches!(command, Command::CacheStatus) {
            output::print_cache_status(&status, &cache.ids());
        }
        Ok(())
    }
}

async fn run_lookup<S: DataSource>(
    command: Command,
    service: LookupService<S>,
    json: bool,
) -> Result<()> {
    match command {
        Command::List => {
            let vaccines = service.list_all().await.context("Failed to list vaccines")?;
            if json {
                print_json(&vaccines)
            } else {
                output::print_vaccine_list(&vaccines);
                Ok(())
            }
        }
        Command::Show(id) => {
            let cached = service.is_cached(id);
            let details = service.get_by_id(id).await?;
            debug!(id, cached, "Showing vaccine");
            if json {
                print_json(&details)
            } else {
                output::print_vaccine_details(&details);
                Ok(())
            }
        }
        Command::Stats => {
            let stats = service.get_stats().await.context("Failed to load statistics")?;
            if json {
                print_json(&stats)
            } else {
                output::print_stats(&stats);
                Ok(())
            }
        }
        Command::Search(term) => {
            let vaccines = service.search(&term).await.context("Search failed")?;
            if json {
                print_json(&vaccines)
            } else {
                output::print_vaccine_list(&vaccines);
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&raw)?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing(args.log_file.as_deref())?;

    if args.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;
    let cache = open_cache(&config)?;

    if matches!(
        args.command,
        Command::CacheStatus | Command::CacheClear | Command::CachePrune
    ) {
        return run_cache_command(&args.command, &cache, args.json);
    }

    if let Some(path) = &config.snapshot_path {
        info!(path = %path.display(), "Using snapshot source");
        let source = SnapshotSource::load(path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        run_lookup(args.command, LookupService::new(source, cache), args.json).await
    } else if let Some(url) = &config.api_url {
        info!(url = %url, "Using REST source");
        let client = RestClient::new(url, config.api_key.as_deref())?;
        run_lookup(args.command, LookupService::new(client, cache), args.json).await
    } else {
        bail!(
            "No data source configured. Set VAXLOOKUP_API_URL or VAXLOOKUP_SNAPSHOT, \
             or add api_url to {}",
            Config::config_path()?.display()
        )
    }
}
