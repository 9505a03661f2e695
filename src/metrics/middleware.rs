use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Instant};
use tracing::debug;

use super::{
    labels::{handler_label, host_label},
    PrometheusMetrics, RequestLabels,
};

/// Measures each request and records it in the duration histogram and the
/// request counter. Requests for the scrape path pass through untouched.
///
/// Installed by [`PrometheusMetrics::instrument`]; usable directly with
/// `axum::middleware::from_fn_with_state`.
pub async fn track_requests(
    State(metrics): State<Arc<PrometheusMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    if req.uri().path() == metrics.metrics_path() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().clone();
    let url_from_request = metrics.url_label_source().from_request(&req);
    let host = metrics.wants_host_label().then(|| host_label(&req));
    let handler = metrics.wants_handler_label().then(|| handler_label(&req));

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status();
    let url = metrics.url_label_source().resolve(url_from_request, &response);

    let labels = RequestLabels {
        code: status.as_u16().to_string(),
        path: format!("{}_{}", method, url),
        handler,
        host,
    };
    metrics.observe(&labels, elapsed);

    debug!(
        http.method = %method,
        metrics.path = %labels.path,
        http.status_code = status.as_u16(),
        http.response.duration = ?elapsed,
        "Request metrics recorded"
    );

    response
}
