//! Prometheus request metrics for axum.
//!
//! Wraps a router so every request is timed and counted, and serves the
//! collected metrics in the Prometheus text format, either on the same
//! router or on a separate listener.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;

use axum::{routing::get, Router};
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use crate::config::AppConfig;
pub use crate::error::{AppError, Result};
pub use crate::metrics::{ContextLabels, PrometheusMetrics, PrometheusMetricsBuilder};

use crate::cli::Cli;
use crate::handlers::{health_check, root_handler, user_handler};

/// Demo application routes, without instrumentation.
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/users/:id", get(user_handler))
}

/// Loads configuration, registers the metrics and builds the instrumented
/// demo router. When a metrics listen address is configured the scrape
/// listener is already running when this returns.
pub async fn run(cli: &Cli) -> Result<(Router, AppConfig)> {
    info!("Starting Prometheus metrics demo...");

    let config = setup_configuration(cli)?;

    let metrics = PrometheusMetrics::from_config(&config.metrics).map_err(|e| {
        error!(error = ?e, "Failed to register request metrics. Exiting.");
        e
    })?;

    // The access log sits outside the interceptor; a separate metrics
    // listener gets neither.
    let app = metrics
        .use_custom(create_router())
        .await?
        .layer(TraceLayer::new_for_http());

    match metrics.bound_metrics_address() {
        Some(address) => info!(metrics.address = %address, metrics.path = %metrics.metrics_path(), "Metrics served on separate listener"),
        None => info!(metrics.path = %metrics.metrics_path(), "Metrics served on application router"),
    }

    Ok((app, config))
}

fn setup_configuration(cli: &Cli) -> Result<AppConfig> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    let mut app_config = config::load_config(&config_path).map_err(|e| {
        error!(
            config.path = %config_path.display(),
            error = ?e,
            "Failed to load or validate configuration. Exiting."
        );
        e
    })?;

    cli.apply(&mut app_config);
    config::ConfigValidator::validate(&app_config)?;

    info!(
        server.host = %app_config.server.host,
        server.port = app_config.server.port,
        metrics.subsystem = %app_config.metrics.subsystem,
        "Configuration loaded and validated successfully."
    );

    Ok(app_config)
}
