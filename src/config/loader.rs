// src/config/loader.rs

use crate::config::{AppConfig, ConfigValidator};
use crate::error::{AppError, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from file or defaults, then apply environment overrides.
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    let mut config = if config_path.exists() {
        info!("Loading configuration from file: {}", config_path.display());
        load_from_file(config_path)?
    } else {
        info!("Configuration file not found, using defaults");
        AppConfig::default()
    };

    override_with_env(&mut config)?;

    ConfigValidator::validate(&config)?;

    debug!("Configuration loaded and validated successfully");
    Ok(config)
}

fn load_from_file(config_path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(config_path).map_err(|_| AppError::ConfigNotFound {
        path: config_path.display().to_string(),
    })?;

    Ok(serde_yaml::from_str(&content)?)
}

fn override_with_env(config: &mut AppConfig) -> Result<()> {
    if let Ok(port_str) = std::env::var("PORT") {
        if let Ok(port) = port_str.parse::<u16>() {
            info!("Overriding server port from environment variable: {}", port);
            config.server.port = port;
        } else {
            warn!("Invalid PORT environment variable: {}", port_str);
        }
    }

    if let Ok(subsystem) = std::env::var("METRICS_SUBSYSTEM") {
        info!("Overriding metrics subsystem from environment: {}", subsystem);
        config.metrics.subsystem = subsystem;
    }

    if let Ok(path) = std::env::var("METRICS_PATH") {
        info!("Overriding metrics path from environment: {}", path);
        config.metrics.metrics_path = path;
    }

    // An empty value clears a file-configured address.
    if let Ok(address) = std::env::var("METRICS_LISTEN_ADDRESS") {
        if address.is_empty() {
            config.metrics.listen_address = None;
        } else {
            info!("Overriding metrics listen address from environment: {}", address);
            config.metrics.listen_address = Some(address.parse()?);
        }
    }

    Ok(())
}
