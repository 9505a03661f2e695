// src/config/app.rs

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::metrics::DEFAULT_METRICS_PATH;

#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Settings for the instrumentation layer and the scrape endpoint.
#[derive(Debug, Deserialize, Clone, PartialEq, Serialize)]
pub struct MetricsConfig {
    /// Prefix joined to metric names with `_`. Empty means no prefix.
    #[serde(default)]
    pub subsystem: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    /// Serve the scrape route on its own listener instead of the app router.
    #[serde(default)]
    pub listen_address: Option<SocketAddr>,
    /// Read the URL label from `ContextLabels` under this key.
    #[serde(default)]
    pub url_label_from_context: Option<String>,
    #[serde(default)]
    pub host_label: bool,
    #[serde(default)]
    pub handler_label: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            subsystem: String::new(),
            metrics_path: default_metrics_path(),
            listen_address: None,
            url_label_from_context: None,
            host_label: false,
            handler_label: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    37321
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 37321);
        assert_eq!(config.metrics.metrics_path, "/metrics");
        assert!(config.metrics.listen_address.is_none());
    }

    #[test]
    fn test_partial_metrics_section() {
        let yaml = "metrics:\n  subsystem: gin\n  listen_address: 127.0.0.1:9100\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.metrics.subsystem, "gin");
        assert_eq!(config.metrics.metrics_path, "/metrics");
        assert_eq!(
            config.metrics.listen_address,
            Some("127.0.0.1:9100".parse().unwrap())
        );
    }
}
