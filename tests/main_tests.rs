// tests/main_tests.rs

use axum_prometheus_middleware::{cli::Cli, handlers::GREETING, run};
use axum_test::TestServer;
use clap::Parser;

#[tokio::test]
async fn test_run_builds_instrumented_demo() {
    let cli = Cli::try_parse_from([
        "prometheus-demo",
        "--config",
        "/definitely/not/here.yaml",
        "--subsystem",
        "demo_run",
        "--port",
        "8090",
    ])
    .unwrap();

    let (app, config) = run(&cli).await.unwrap();
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.metrics.subsystem, "demo_run");

    let server = TestServer::new(app).unwrap();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_json(&GREETING.to_string());

    server.get("/users/42").await.assert_status_ok();

    let body = server.get("/metrics").await.text();
    assert!(body.contains("demo_run_request_count"));
    assert!(body.contains(r#"path="GET_/""#));
    assert!(body.contains(r#"path="GET_/users/42""#));
}

#[tokio::test]
async fn test_run_rejects_invalid_subsystem() {
    let cli = Cli::try_parse_from([
        "prometheus-demo",
        "--config",
        "/definitely/not/here.yaml",
        "--subsystem",
        "bad-name",
    ])
    .unwrap();

    assert!(run(&cli).await.is_err());
}
