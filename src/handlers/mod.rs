// src/handlers/mod.rs

//! Demo routes served by the `prometheus-demo` binary.

use axum::{http::StatusCode, response::IntoResponse, Extension, Json};

use crate::metrics::ContextLabels;

pub const GREETING: &str = "Hello world! visit /metrics for metrics";

pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(GREETING))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(GREETING))
}

/// Stashes its route template so `url_label_from_context: route` can
/// group `/users/1`, `/users/2`, ... under one label.
pub async fn user_handler() -> impl IntoResponse {
    (
        Extension(ContextLabels::new().with("route", "/users/:id")),
        Json(GREETING),
    )
}
