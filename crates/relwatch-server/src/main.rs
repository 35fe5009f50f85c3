//! relwatch - release and update aggregation server.
//!
//! `relwatch serve` runs the HTTP API; `relwatch check` checks a list of
//! packages once and prints the results as JSON lines.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relwatch_core::config::{AppConfig, RateLimitConfig};
use relwatch_core::{CacheStore, MemoryStore, ServiceConfig, SqliteStore, UpdateLogStore, UpdateService};
use relwatch_server::check::{parse_packages, run_check};
use relwatch_server::{start_server, AppState, FixedWindowLimiter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "relwatch", version)]
#[command(about = "Aggregates release information for languages, packages and GitHub repositories")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (0 = auto-assign)
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Persist the cache in this SQLite file instead of memory
        #[arg(long)]
        cache_db: Option<PathBuf>,

        /// Record batch checks in this SQLite file
        #[arg(long)]
        audit_db: Option<PathBuf>,

        /// Requests per client IP per minute on /api routes
        #[arg(long, default_value_t = RateLimitConfig::MAX_REQUESTS)]
        rate_limit: u32,
    },

    /// Check packages once and print one JSON line per package
    Check {
        /// Comma-separated `[type:]name[@current]` list (type defaults to npm)
        #[arg(long)]
        packages: Option<String>,

        /// Record results in this SQLite file
        #[arg(long)]
        audit_db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so `check` output stays machine-readable
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match args.command {
        Command::Serve {
            port,
            host,
            cache_db,
            audit_db,
            rate_limit,
        } => serve(&host, port, cache_db, audit_db, rate_limit).await,
        Command::Check { packages, audit_db } => check(packages, audit_db).await,
    }
}

fn build_service(cache_db: Option<PathBuf>, audit_db: Option<PathBuf>) -> Result<UpdateService> {
    let store: Arc<dyn CacheStore> = match cache_db {
        Some(path) => {
            info!("Using persistent cache at {}", path.display());
            let store = SqliteStore::new(&path)
                .with_context(|| format!("opening cache database {}", path.display()))?;
            let removed = store.cleanup_expired()?;
            info!("Removed {} expired cache entries", removed);
            Arc::new(store)
        }
        None => Arc::new(MemoryStore::new()),
    };

    let mut service = UpdateService::new(ServiceConfig::default(), store)?;
    if let Some(path) = audit_db {
        let audit = UpdateLogStore::open(&path)
            .with_context(|| format!("opening audit database {}", path.display()))?;
        service = service.with_audit(Arc::new(audit));
    }
    Ok(service)
}

async fn serve(
    host: &str,
    port: u16,
    cache_db: Option<PathBuf>,
    audit_db: Option<PathBuf>,
    rate_limit: u32,
) -> Result<()> {
    info!("Starting {} v{}", AppConfig::APP_NAME, AppConfig::VERSION);

    let service = build_service(cache_db, audit_db)?;
    let limiter = FixedWindowLimiter::new(rate_limit, RateLimitConfig::WINDOW);
    let addr = start_server(Arc::new(AppState::new(service, limiter)), host, port).await?;

    info!("API available at http://{}/api/updates", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}

async fn check(packages: Option<String>, audit_db: Option<PathBuf>) -> Result<()> {
    let packages = packages.context("Specify the packages to check with --packages")?;
    let specs = parse_packages(&packages)?;

    let service = build_service(None, audit_db)?;
    let stdout = std::io::stdout();
    run_check(&service, &specs, &mut stdout.lock()).await?;

    Ok(())
}
