//! pcs-calc - Percentage calculator service
//!
//! Serves the calculation and call-history HTTP API. Configuration comes from
//! a TOML file (see `pcs_common::config`) with command-line overrides.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcs_calc::db::{CallHistoryStore, SqliteCallHistoryStore};
use pcs_calc::services::{
    build_percentage_source, AsyncAuditRecorder, CalculationEngine, CalculationOrchestrator,
    CounterMetrics, MokaPercentageCache, PercentageResolver,
};
use pcs_calc::{build_router, AppState};
use pcs_common::config::{resolve_config_path, ServiceConfig};

/// Command-line arguments for pcs-calc
#[derive(Parser, Debug)]
#[command(name = "pcs-calc")]
#[command(about = "Percentage calculator service with cached fallback and call history")]
#[command(version)]
struct Args {
    /// Config file (defaults to $PCS_CONFIG, then <config dir>/pcs/pcs-calc.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PCS_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "PCS_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config =
        ServiceConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }
    config.validate().context("Invalid configuration")?;

    // RUST_LOG takes precedence over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pcs-calc v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file, using defaults"),
    }

    let pool = pcs_common::db::init_database(&config.database.path)
        .await
        .context("Failed to initialize database")?;
    info!("Database path: {}", config.database.path.display());

    let history: Arc<dyn CallHistoryStore> = Arc::new(SqliteCallHistoryStore::new(pool.clone()));

    let source = build_percentage_source(&config.percentage_source)
        .context("Failed to build percentage source")?;
    let cache = Arc::new(MokaPercentageCache::from_config(&config.cache));
    let resolver = PercentageResolver::new(source, cache);

    let workers = config.audit.effective_workers();
    let audit = Arc::new(AsyncAuditRecorder::start(
        Arc::clone(&history),
        workers,
        config.audit.queue_capacity,
    ));
    let metrics = Arc::new(CounterMetrics::new());

    let orchestrator = Arc::new(CalculationOrchestrator::new(
        resolver,
        CalculationEngine::new(),
        audit.clone(),
        metrics.clone(),
    ));

    let app = build_router(AppState::new(orchestrator, history, metrics));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("pcs-calc listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    audit
        .shutdown(Duration::from_secs(config.audit.shutdown_grace_secs))
        .await;
    pool.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
