// tests/registry_tests.rs

//! Runs in its own process: the application installs the global recorder
//! before any metrics are built.

mod common;

use axum::{routing::get, Router};
use axum_prometheus_middleware::{
    metrics::{MetricsRegistry, DURATION_BUCKETS, DURATION_METRIC_SUFFIX},
    AppError, PrometheusMetrics,
};
use common::{fetch, render, sample_value};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

#[tokio::test]
async fn test_adopts_recorder_installed_by_application() {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix(DURATION_METRIC_SUFFIX.to_string()),
            &DURATION_BUCKETS,
        )
        .unwrap()
        .install_recorder()
        .unwrap();

    let registry = MetricsRegistry::init_with_handle(handle.clone()).unwrap();
    assert!(std::ptr::eq(registry, MetricsRegistry::global().unwrap()));

    let metrics = PrometheusMetrics::new("host_app").unwrap();
    let app = metrics.use_router(Router::new().route("/", get(|| async { "ok" })));

    let (status, _) = fetch(&app, "/").await;
    assert_eq!(status, 200);

    let labels = [("code", "200"), ("path", "GET_/")];
    assert_eq!(sample_value(&handle.render(), "host_app_request_count", &labels), Some(1.0));
    assert_eq!(sample_value(&render(), "host_app_request_count", &labels), Some(1.0));
    assert!(handle
        .render()
        .contains("host_app_request_duration_seconds_bucket"));

    let (status, body) = fetch(&app, "/metrics").await;
    assert_eq!(status, 200);
    assert!(body.contains("host_app_request_count"));

    let second = PrometheusBuilder::new().build_recorder().handle();
    assert!(matches!(
        MetricsRegistry::init_with_handle(second),
        Err(AppError::RecorderInstall { .. })
    ));
}
