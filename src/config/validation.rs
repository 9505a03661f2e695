// src/config/validation.rs

use crate::config::{AppConfig, MetricsConfig};
use crate::error::{AppError, Result};
use tracing::{debug, warn};

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> Result<()> {
        debug!("Starting configuration validation");

        if let Err(e) = Self::validate_metrics_config(&config.metrics) {
            warn!("Metrics config validation failed: {}", e);
            return Err(e);
        }
        debug!("Metrics config validation passed");

        if config.server.port == 0 {
            warn!("Server config validation failed: port is 0");
            return Err(AppError::config_validation(
                "Server port cannot be 0",
                Some("server.port"),
            ));
        }
        debug!("Server config validation passed");

        Ok(())
    }

    pub fn validate_metrics_config(config: &MetricsConfig) -> Result<()> {
        Self::validate_subsystem(&config.subsystem)?;

        if !config.metrics_path.starts_with('/') {
            return Err(AppError::config_validation(
                format!("Metrics path must start with '/': {}", config.metrics_path),
                Some("metrics.metrics_path"),
            ));
        }

        if let Some(key) = &config.url_label_from_context {
            if key.is_empty() {
                return Err(AppError::config_validation(
                    "Context label key cannot be empty",
                    Some("metrics.url_label_from_context"),
                ));
            }
        }

        Ok(())
    }

    /// Subsystems become metric name prefixes, so they follow the
    /// Prometheus name alphabet.
    pub fn validate_subsystem(subsystem: &str) -> Result<()> {
        let mut chars = subsystem.chars();
        let valid = match chars.next() {
            None => true,
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
        };

        if valid {
            Ok(())
        } else {
            Err(AppError::config_validation(
                format!("Invalid metrics subsystem: {subsystem}"),
                Some("metrics.subsystem"),
            ))
        }
    }
}
