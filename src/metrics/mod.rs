//! Request metrics for axum routers.
//!
//! [`PrometheusMetrics`] registers two metrics in the process-wide registry:
//!
//! - `<subsystem>_request_duration_seconds`: histogram of request latencies
//! - `<subsystem>_request_count`: counter of handled requests
//!
//! Both are labelled by status `code` and `path` (`METHOD_url`), optionally
//! by `handler` and `host`. The same instance then wraps a router with the
//! request interceptor and exposes the scrape route.
//!
//! ```rust,ignore
//! let app = Router::new().route("/", get(root));
//! let app = PrometheusMetrics::new("gin")?.use_router(app);
//! ```

pub mod exporters;
pub mod labels;
pub mod middleware;
pub mod registry;

pub use exporters::{metrics_handler, metrics_router, serve_metrics, PROMETHEUS_CONTENT_TYPE};
pub use labels::{matched_path_label, ContextLabels, UrlLabelMapper, UrlLabelSource, UNKNOWN_LABEL};
pub use middleware::track_requests;
pub use registry::{
    MetricDefinition, MetricKind, MetricsRegistry, DURATION_BUCKETS, DURATION_METRIC_SUFFIX,
};

use axum::{extract::Request, middleware::from_fn_with_state, routing::get, Router};
use metrics::{counter, histogram, Label};
use once_cell::sync::OnceCell;
use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::config::{ConfigValidator, MetricsConfig};
use crate::error::{AppError, Result};

pub const DEFAULT_METRICS_PATH: &str = "/metrics";

const DURATION_NAME: &str = "request_duration_seconds";
const DURATION_HELP: &str = "Histogram request latencies";
const COUNT_NAME: &str = "request_count";
const COUNT_HELP: &str = "Number of handled requests";

/// Label values computed for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLabels {
    pub code: String,
    pub path: String,
    pub handler: Option<String>,
    pub host: Option<String>,
}

impl RequestLabels {
    fn to_labels(&self) -> Vec<Label> {
        let mut labels = vec![
            Label::new("code", self.code.clone()),
            Label::new("path", self.path.clone()),
        ];
        if let Some(handler) = &self.handler {
            labels.push(Label::new("handler", handler.clone()));
        }
        if let Some(host) = &self.host {
            labels.push(Label::new("host", host.clone()));
        }
        labels
    }
}

/// Builder for [`PrometheusMetrics`]. Registration happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct PrometheusMetricsBuilder {
    subsystem: String,
    metrics_path: String,
    listen_address: Option<SocketAddr>,
    url_label: UrlLabelSource,
    host_label: bool,
    handler_label: bool,
}

impl PrometheusMetricsBuilder {
    pub fn new(subsystem: impl Into<String>) -> Self {
        Self {
            subsystem: subsystem.into(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            listen_address: None,
            url_label: UrlLabelSource::default(),
            host_label: false,
            handler_label: false,
        }
    }

    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = path.into();
        self
    }

    /// Serve the scrape route on a separate listener.
    pub fn listen_address(mut self, address: SocketAddr) -> Self {
        self.listen_address = Some(address);
        self
    }

    pub fn url_label_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.url_label = UrlLabelSource::Mapper(Arc::new(mapper));
        self
    }

    pub fn url_label_from_context(mut self, key: impl Into<String>) -> Self {
        self.url_label = UrlLabelSource::Context(key.into());
        self
    }

    pub fn host_label(mut self, enabled: bool) -> Self {
        self.host_label = enabled;
        self
    }

    pub fn handler_label(mut self, enabled: bool) -> Self {
        self.handler_label = enabled;
        self
    }

    /// Validates the settings and registers both metrics. Fails if either
    /// name is already registered in this process.
    pub fn build(self) -> Result<PrometheusMetrics> {
        ConfigValidator::validate_metrics_config(&MetricsConfig {
            subsystem: self.subsystem.clone(),
            metrics_path: self.metrics_path.clone(),
            listen_address: self.listen_address,
            url_label_from_context: match &self.url_label {
                UrlLabelSource::Context(key) => Some(key.clone()),
                _ => None,
            },
            host_label: self.host_label,
            handler_label: self.handler_label,
        })?;

        let mut label_names = vec!["code", "path"];
        if self.handler_label {
            label_names.push("handler");
        }
        if self.host_label {
            label_names.push("host");
        }

        let duration = MetricDefinition::histogram(
            &self.subsystem,
            DURATION_NAME,
            DURATION_HELP,
            label_names.clone(),
            &DURATION_BUCKETS,
        );
        let count = MetricDefinition::counter(&self.subsystem, COUNT_NAME, COUNT_HELP, label_names);

        MetricsRegistry::global()?.register_all(vec![duration.clone(), count.clone()])?;

        info!(
            metrics.subsystem = %self.subsystem,
            metrics.path = %self.metrics_path,
            metrics.url_label = ?self.url_label,
            "Request metrics registered"
        );

        Ok(PrometheusMetrics {
            metrics_path: self.metrics_path,
            listen_address: self.listen_address,
            url_label: self.url_label,
            host_label: self.host_label,
            handler_label: self.handler_label,
            duration,
            count,
            bound_address: Arc::new(OnceCell::new()),
        })
    }
}

/// Registered request metrics plus the settings of the interceptor.
#[derive(Clone)]
pub struct PrometheusMetrics {
    metrics_path: String,
    listen_address: Option<SocketAddr>,
    url_label: UrlLabelSource,
    host_label: bool,
    handler_label: bool,
    duration: MetricDefinition,
    count: MetricDefinition,
    bound_address: Arc<OnceCell<SocketAddr>>,
}

impl fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusMetrics")
            .field("metrics_path", &self.metrics_path)
            .field("listen_address", &self.listen_address)
            .field("url_label", &self.url_label)
            .field("duration", &self.duration.name)
            .field("count", &self.count.name)
            .finish()
    }
}

impl PrometheusMetrics {
    /// Registers the metrics with default settings.
    pub fn new(subsystem: impl Into<String>) -> Result<Self> {
        Self::builder(subsystem).build()
    }

    pub fn builder(subsystem: impl Into<String>) -> PrometheusMetricsBuilder {
        PrometheusMetricsBuilder::new(subsystem)
    }

    pub fn from_config(config: &MetricsConfig) -> Result<Self> {
        let mut builder = Self::builder(config.subsystem.clone())
            .metrics_path(config.metrics_path.clone())
            .host_label(config.host_label)
            .handler_label(config.handler_label);

        if let Some(address) = config.listen_address {
            builder = builder.listen_address(address);
        }
        if let Some(key) = &config.url_label_from_context {
            builder = builder.url_label_from_context(key.clone());
        }

        builder.build()
    }

    pub fn metrics_path(&self) -> &str {
        &self.metrics_path
    }

    pub fn listen_address(&self) -> Option<SocketAddr> {
        self.listen_address
    }

    /// Address the separate metrics listener is bound to, once started.
    pub fn bound_metrics_address(&self) -> Option<SocketAddr> {
        self.bound_address.get().copied()
    }

    pub fn duration_metric(&self) -> &MetricDefinition {
        &self.duration
    }

    pub fn count_metric(&self) -> &MetricDefinition {
        &self.count
    }

    pub fn url_label_source(&self) -> &UrlLabelSource {
        &self.url_label
    }

    pub(crate) fn wants_host_label(&self) -> bool {
        self.host_label
    }

    pub(crate) fn wants_handler_label(&self) -> bool {
        self.handler_label
    }

    /// Records one finished request.
    pub fn observe(&self, labels: &RequestLabels, elapsed: Duration) {
        let labels = labels.to_labels();
        histogram!(self.duration.name.clone(), labels.clone()).record(elapsed.as_secs_f64());
        counter!(self.count.name.clone(), labels).increment(1);
    }

    /// Wraps every route currently on the router with the interceptor.
    /// Routes added afterwards are not instrumented.
    pub fn instrument<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(from_fn_with_state(Arc::new(self.clone()), track_requests))
    }

    /// Instruments the router and serves the scrape route on it.
    pub fn use_router<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.instrument(router.route(&self.metrics_path, get(metrics_handler)))
    }

    /// Instruments the router. The scrape route goes to a separate listener
    /// when a listen address is configured, otherwise onto the same router.
    /// The listener is started at most once per instance; a second call
    /// returns [`AppError::Bind`].
    pub async fn use_custom<S>(&self, router: Router<S>) -> Result<Router<S>>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.use_custom_with_router(router, Router::new()).await
    }

    /// Like [`use_custom`](Self::use_custom), but the separate listener
    /// serves `metrics_app` with the scrape route added to it.
    pub async fn use_custom_with_router<S>(
        &self,
        router: Router<S>,
        metrics_app: Router,
    ) -> Result<Router<S>>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self.listen_address {
            Some(address) => {
                if let Some(running) = self.bound_address.get() {
                    warn!(server.address = %running, "Metrics listener already started");
                    return Err(AppError::Bind {
                        address: address.to_string(),
                        message: format!("metrics listener already running on {running}"),
                    });
                }

                let metrics_app = metrics_app.merge(metrics_router(&self.metrics_path));
                let bound = serve_metrics(address, metrics_app).await?;
                if self.bound_address.set(bound).is_err() {
                    warn!(server.address = %bound, "Concurrent metrics listener start, address not recorded");
                }
                Ok(self.instrument(router))
            }
            None => Ok(self.use_router(router)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_labels_order() {
        let labels = RequestLabels {
            code: "200".to_string(),
            path: "GET_/".to_string(),
            handler: Some("/".to_string()),
            host: None,
        }
        .to_labels();

        let keys: Vec<&str> = labels.iter().map(|l| l.key()).collect();
        assert_eq!(keys, vec!["code", "path", "handler"]);
    }

    #[test]
    fn test_new_registers_prefixed_names() {
        let metrics = PrometheusMetrics::new("mod_unit_names").unwrap();
        assert_eq!(metrics.duration_metric().name, "mod_unit_names_request_duration_seconds");
        assert_eq!(metrics.count_metric().name, "mod_unit_names_request_count");
        assert_eq!(metrics.metrics_path(), DEFAULT_METRICS_PATH);

        let registry = MetricsRegistry::global().unwrap();
        assert!(registry.is_registered("mod_unit_names_request_count"));
        assert_eq!(
            registry
                .definition("mod_unit_names_request_duration_seconds")
                .unwrap()
                .labels,
            vec!["code", "path"]
        );
    }

    #[test]
    fn test_same_subsystem_twice_fails() {
        let _first = PrometheusMetrics::new("mod_unit_twice").unwrap();
        let err = PrometheusMetrics::new("mod_unit_twice").unwrap_err();
        assert!(matches!(err, AppError::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_invalid_subsystem_rejected_before_registration() {
        let err = PrometheusMetrics::new("not-valid").unwrap_err();
        assert!(matches!(err, AppError::ConfigValidation { .. }));
        assert!(!MetricsRegistry::global().unwrap().is_registered("not-valid_request_count"));
    }

    #[test]
    fn test_from_config_carries_label_options() {
        let config = MetricsConfig {
            subsystem: "mod_unit_config".to_string(),
            metrics_path: "/internal/metrics".to_string(),
            url_label_from_context: Some("route".to_string()),
            host_label: true,
            handler_label: true,
            ..MetricsConfig::default()
        };

        let metrics = PrometheusMetrics::from_config(&config).unwrap();
        assert_eq!(metrics.metrics_path(), "/internal/metrics");
        assert_eq!(metrics.count_metric().labels, vec!["code", "path", "handler", "host"]);
        assert!(matches!(metrics.url_label_source(), UrlLabelSource::Context(key) if key == "route"));
    }
}
