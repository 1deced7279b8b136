//! toxscan server
//!
//! HTTP serving layer over the model registry: loads every configured
//! classification backend at startup, serves predictions from the active
//! backend, and switches the active backend at runtime without dropping
//! in-flight requests.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use toxscan_backends::{BackendsConfig, KindLoader, ModelRegistry};

mod routes;
mod state;

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "toxscan-server")]
#[command(about = "Multi-backend hate speech classification server", long_about = None)]
struct Cli {
    /// Backend configuration file path
    #[arg(short, long, default_value = "config/backends.yaml")]
    config: String,

    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0")]
    listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "8000")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting toxscan server");

    // Load configuration
    let config = BackendsConfig::from_file(&cli.config)?;
    info!("Configuration loaded from {}", cli.config);
    info!("Configured backends: {}", config.backends.len());
    info!("Default backend: {}", config.default_backend);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Load every backend and build the registry. A failed default backend
    // is fatal; any other failure is recorded and served as Failed.
    let descriptors = config.to_descriptors()?;
    let registry = ModelRegistry::bootstrap(descriptors, &config.default_backend, &KindLoader)?;
    info!(
        "Registry ready: {}/{} backends loaded",
        registry.ready_count(),
        registry.len()
    );

    let state = AppState::new(Arc::new(registry), metrics_handle);
    let app = routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("toxscan=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("toxscan=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "toxscan_predictions_total",
        "Total number of predictions served, by backend"
    );
    metrics::describe_counter!(
        "toxscan_switches_total",
        "Total number of successful backend switches"
    );
    metrics::describe_counter!("toxscan_errors_total", "Total number of errors by kind");
    metrics::describe_histogram!(
        "toxscan_inference_latency_us",
        metrics::Unit::Microseconds,
        "Inference latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
