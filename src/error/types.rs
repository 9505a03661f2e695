//! Conversions from library errors into `AppError`.

use super::AppError;

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigParse {
            line: err.location().map(|loc| loc.line()),
            message: err.to_string(),
        }
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(err: std::net::AddrParseError) -> Self {
        Self::config_validation(format!("Invalid socket address: {err}"), Some("listen_address"))
    }
}

impl From<metrics_exporter_prometheus::BuildError> for AppError {
    fn from(err: metrics_exporter_prometheus::BuildError) -> Self {
        Self::RecorderInstall {
            message: err.to_string(),
        }
    }
}
