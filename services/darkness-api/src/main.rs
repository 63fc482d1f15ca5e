//! Darkness API Server
//!
//! Night sky brightness lookups over the VIIRS annual composites.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use darkness_api::app;
use darkness_api::config::ServiceConfig;
use darkness_api::state::AppState;

/// Darkness API Server
#[derive(Parser, Debug)]
#[command(name = "darkness-api")]
#[command(about = "Night sky brightness lookup server for VIIRS composites")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "DARKNESS_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "DARKNESS_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// YAML config file; environment variables are used when absent
    #[arg(short, long, env = "DARKNESS_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting darkness API server");

    let config = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)?,
        None => ServiceConfig::from_env()?,
    };
    info!(
        average = %config.sources.average,
        mask = %config.sources.mask,
        resource_dir = %config.resource_dir.display(),
        requests = config.rate_limit.requests,
        duration_seconds = config.rate_limit.duration_seconds,
        "Service configuration"
    );

    let state = Arc::new(AppState::new(config)?.with_prometheus(prometheus_handle));

    // The default dataset must be usable before accepting traffic.
    state
        .lookup
        .warm_up()
        .await
        .context("Failed to load default dataset")?;

    let app = app::router(Arc::clone(&state));

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("Darkness API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server failed")?;

    Ok(())
}
