// src/metrics/registry.rs

//! Process-wide metrics registry.
//!
//! The Prometheus recorder is installed once, on first use, and lives for the
//! rest of the process. Applications that install their own recorder hand its
//! handle over with [`MetricsRegistry::init_with_handle`] before building any
//! metrics. Metric definitions are tracked by full name so that a
//! second registration under the same name fails instead of silently sharing
//! series with the first.

use dashmap::{mapref::entry::Entry, DashMap};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

/// Latency buckets in seconds.
pub const DURATION_BUCKETS: [f64; 17] = [
    0.005, 0.01, 0.02, 0.04, 0.06, 0.08, 0.1, 0.15, 0.25, 0.4, 0.6, 0.8, 1.0, 1.5, 2.0, 3.0, 5.0,
];

/// Every metric whose name ends with this suffix is exported as a histogram
/// with [`DURATION_BUCKETS`].
pub const DURATION_METRIC_SUFFIX: &str = "request_duration_seconds";

static REGISTRY: OnceCell<MetricsRegistry> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Histogram,
    Counter,
}

/// Name, help text and label set of one registered metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub labels: Vec<&'static str>,
    pub buckets: Option<&'static [f64]>,
}

impl MetricDefinition {
    pub fn histogram(
        subsystem: &str,
        name: &str,
        help: impl Into<String>,
        labels: Vec<&'static str>,
        buckets: &'static [f64],
    ) -> Self {
        Self {
            name: full_name(subsystem, name),
            help: help.into(),
            kind: MetricKind::Histogram,
            labels,
            buckets: Some(buckets),
        }
    }

    pub fn counter(
        subsystem: &str,
        name: &str,
        help: impl Into<String>,
        labels: Vec<&'static str>,
    ) -> Self {
        Self {
            name: full_name(subsystem, name),
            help: help.into(),
            kind: MetricKind::Counter,
            labels,
            buckets: None,
        }
    }
}

/// Joins subsystem and name the way Prometheus client libraries do.
pub fn full_name(subsystem: &str, name: &str) -> String {
    if subsystem.is_empty() {
        name.to_string()
    } else {
        format!("{subsystem}_{name}")
    }
}

pub struct MetricsRegistry {
    handle: PrometheusHandle,
    definitions: DashMap<String, MetricDefinition>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("definitions", &self.definitions)
            .finish_non_exhaustive()
    }
}

impl MetricsRegistry {
    /// Returns the registry, installing the global recorder on first call.
    pub fn global() -> Result<&'static MetricsRegistry> {
        REGISTRY.get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Suffix(DURATION_METRIC_SUFFIX.to_string()),
                    &DURATION_BUCKETS,
                )?
                .install_recorder()?;

            info!(
                buckets = DURATION_BUCKETS.len(),
                "Prometheus recorder installed"
            );

            Ok(Self::with_handle(handle))
        })
    }

    /// Adopts a recorder the application already installed.
    ///
    /// Must run before the first [`global`](Self::global) call. Latency
    /// histograms only get [`DURATION_BUCKETS`] if the application's builder
    /// binds them with `Matcher::Suffix(DURATION_METRIC_SUFFIX)`; otherwise
    /// the exporter renders them as summaries.
    pub fn init_with_handle(handle: PrometheusHandle) -> Result<&'static MetricsRegistry> {
        REGISTRY
            .set(Self::with_handle(handle))
            .map_err(|_| AppError::RecorderInstall {
                message: "metrics registry already initialized".to_string(),
            })?;

        info!("Adopted existing Prometheus recorder");
        Self::global()
    }

    fn with_handle(handle: PrometheusHandle) -> Self {
        Self {
            handle,
            definitions: DashMap::new(),
        }
    }

    pub fn register(&self, definition: MetricDefinition) -> Result<()> {
        match self.definitions.entry(definition.name.clone()) {
            Entry::Occupied(existing) => {
                warn!(metric.name = %existing.key(), "Duplicate metric registration rejected");
                Err(AppError::AlreadyRegistered {
                    name: existing.key().clone(),
                })
            }
            Entry::Vacant(slot) => {
                match definition.kind {
                    MetricKind::Histogram => describe_histogram!(
                        definition.name.clone(),
                        Unit::Seconds,
                        definition.help.clone()
                    ),
                    MetricKind::Counter => describe_counter!(
                        definition.name.clone(),
                        Unit::Count,
                        definition.help.clone()
                    ),
                }
                debug!(metric.name = %definition.name, metric.kind = ?definition.kind, "Metric registered");
                slot.insert(definition);
                Ok(())
            }
        }
    }

    /// Registers every definition or none of them.
    pub fn register_all(&self, definitions: Vec<MetricDefinition>) -> Result<()> {
        let mut registered: Vec<String> = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let name = definition.name.clone();
            if let Err(e) = self.register(definition) {
                for name in &registered {
                    self.definitions.remove(name);
                }
                return Err(e);
            }
            registered.push(name);
        }

        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<MetricDefinition> {
        self.definitions.get(name).map(|d| d.value().clone())
    }

    /// Current state in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn handle(&self) -> PrometheusHandle {
        self.handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        assert_eq!(full_name("gin", "request_count"), "gin_request_count");
        assert_eq!(full_name("", "request_count"), "request_count");
    }

    #[test]
    fn test_buckets_are_increasing() {
        assert!(DURATION_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_global_is_shared() {
        let a = MetricsRegistry::global().unwrap();
        let b = MetricsRegistry::global().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = MetricsRegistry::global().unwrap();
        let def = MetricDefinition::counter("registry_unit_dup", "request_count", "help", vec!["code"]);

        registry.register(def.clone()).unwrap();
        let err = registry.register(def).unwrap_err();

        assert!(matches!(err, AppError::AlreadyRegistered { ref name } if name == "registry_unit_dup_request_count"));
    }

    #[test]
    fn test_register_all_rolls_back() {
        let registry = MetricsRegistry::global().unwrap();
        registry
            .register(MetricDefinition::counter("registry_unit_rb", "taken", "help", vec![]))
            .unwrap();

        let result = registry.register_all(vec![
            MetricDefinition::counter("registry_unit_rb", "fresh", "help", vec![]),
            MetricDefinition::counter("registry_unit_rb", "taken", "help", vec![]),
        ]);

        assert!(result.is_err());
        assert!(!registry.is_registered("registry_unit_rb_fresh"));
        assert!(registry.is_registered("registry_unit_rb_taken"));
    }

    #[test]
    fn test_init_with_handle_after_global_fails() {
        MetricsRegistry::global().unwrap();

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let err = MetricsRegistry::init_with_handle(handle).unwrap_err();
        assert!(matches!(err, AppError::RecorderInstall { .. }));
    }
}
