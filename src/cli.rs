use clap::Parser;
use std::{net::SocketAddr, path::PathBuf};

use crate::config::AppConfig;

#[derive(Parser, Debug, Default)]
#[command(
    name = "prometheus-demo",
    version,
    about = "Demo server instrumented with the Prometheus request metrics middleware"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PROMETHEUS_DEMO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server bind address
    #[arg(long, env = "PROMETHEUS_DEMO_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Prefix for metric names
    #[arg(short, long)]
    pub subsystem: Option<String>,

    /// Route serving the metrics
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// Serve metrics on a separate address instead of the app port
    #[arg(long, value_name = "ADDR")]
    pub metrics_listen: Option<SocketAddr>,

    /// Log level
    #[arg(short, long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "PROMETHEUS_DEMO_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Command-line flags take precedence over file and environment values.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(subsystem) = &self.subsystem {
            config.metrics.subsystem = subsystem.clone();
        }
        if let Some(path) = &self.metrics_path {
            config.metrics.metrics_path = path.clone();
        }
        if let Some(address) = self.metrics_listen {
            config.metrics.listen_address = Some(address);
        }
    }
}
