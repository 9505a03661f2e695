//! Error handling for the middleware and its demo server.
//!
//! Registration and setup problems are configuration errors and surface
//! immediately at startup. Nothing on the per-request path returns these;
//! the interceptor degrades to default label values instead.

pub mod types;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Problem-details style error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    // Registry errors
    #[error("Metric already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Failed to install Prometheus recorder: {message}")]
    RecorderInstall { message: String },

    // Configuration errors
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String, line: Option<usize> },

    // Serving errors
    #[error("Failed to bind listener on {address}: {message}")]
    Bind { address: String, message: String },

    #[error("IO operation failed: {operation} - {message}")]
    Io { operation: &'static str, message: String },
}

impl AppError {
    pub fn config_validation(message: impl Into<String>, field: Option<impl Into<String>>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
            field: field.map(Into::into),
        }
    }

    pub fn io(operation: &'static str, err: std::io::Error) -> Self {
        Self::Io {
            operation,
            message: err.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigParse { .. } => StatusCode::BAD_REQUEST,

            Self::ConfigNotFound { .. } => StatusCode::NOT_FOUND,

            Self::AlreadyRegistered { .. } => StatusCode::CONFLICT,

            Self::RecorderInstall { .. }
            | Self::ConfigValidation { .. }
            | Self::Bind { .. }
            | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered { .. } | Self::RecorderInstall { .. } => "Metrics Registry Error",
            Self::ConfigValidation { .. } | Self::ConfigNotFound { .. } | Self::ConfigParse { .. } => {
                "Configuration Error"
            }
            Self::Bind { .. } | Self::Io { .. } => "IO Error",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered { .. } | Self::RecorderInstall { .. } => "registry",
            Self::ConfigValidation { .. } | Self::ConfigNotFound { .. } | Self::ConfigParse { .. } => {
                "configuration"
            }
            Self::Bind { .. } | Self::Io { .. } => "io",
        }
    }

    /// Log the error with a level matching its status class.
    pub fn log(&self) {
        if self.status_code().is_server_error() {
            error!(error = %self, error_type = self.error_type(), "Application error occurred");
        } else {
            warn!(error = %self, error_type = self.error_type(), "Client error occurred");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = ErrorResponse {
            error_type: self.error_type().to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
