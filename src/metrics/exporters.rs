use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::MetricsRegistry;
use crate::error::{AppError, Result};

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Renders the process-wide registry.
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let body = MetricsRegistry::global()?.render();
    debug!(bytes = body.len(), "Metrics scraped");
    Ok((StatusCode::OK, [(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body))
}

/// A router that only serves the scrape route.
pub fn metrics_router(path: &str) -> Router {
    Router::new().route(path, get(metrics_handler))
}

/// Binds `address` and serves `router` on a background task for the rest of
/// the process. Bind errors are returned; serve errors are logged.
pub async fn serve_metrics(address: SocketAddr, router: Router) -> Result<SocketAddr> {
    let listener = TcpListener::bind(address).await.map_err(|e| AppError::Bind {
        address: address.to_string(),
        message: e.to_string(),
    })?;
    let bound = listener
        .local_addr()
        .map_err(|e| AppError::io("metrics_local_addr", e))?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router.into_make_service()).await {
            error!(server.address = %bound, error = ?e, "Metrics listener stopped");
        }
    });

    info!(server.address = %bound, "Metrics listener started");
    Ok(bound)
}
