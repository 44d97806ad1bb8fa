//! Metrics declarations for the tile resolver.
//!
//! Every metric the resolver records is declared once in [`metric_defs`] as a
//! const [`Metric`], so names and units cannot drift between the recording
//! site and exporters. The `metrics` crate is re-exported for convenience.
//!
//! Without an installed recorder every `counter!`/`histogram!` call is a
//! no-op, so libraries can record unconditionally. The `prometheus` feature
//! adds `install_prometheus_recorder` for binaries that want the values.
//!
//! # Example
//!
//! ```rust
//! use tileseek_metrics::{metric_defs, MetricKind};
//!
//! assert_eq!(metric_defs::DESCRIPTOR_MATCHES.kind, MetricKind::Counter);
//! metrics::counter!(metric_defs::DESCRIPTOR_MATCHES.name).increment(1);
//! ```

pub use metrics;

#[cfg(feature = "prometheus")]
mod prometheus;
#[cfg(feature = "prometheus")]
pub use metrics_exporter_prometheus::PrometheusHandle;
#[cfg(feature = "prometheus")]
pub use prometheus::install_prometheus_recorder;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use tileseek_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FETCHED: Metric = Metric::counter("tileseek.example.fetched")
///     .with_description("Documents fetched")
///     .with_unit(Unit::Count);
///
/// assert_eq!(FETCHED.name, "tileseek.example.fetched");
/// assert_eq!(FETCHED.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "tileseek.descriptor.fetched").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the resolver.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Spatial index
    // ========================================================================

    /// Index queries issued.
    ///
    /// Labels: outcome (ok, error)
    pub const INDEX_QUERIES: Metric = Metric::counter("tileseek.index.queries")
        .with_description("Spatial index queries issued")
        .with_unit(Unit::Count);

    // ========================================================================
    // Catalog crawl
    // ========================================================================

    /// Catalog pages crawled successfully.
    pub const CATALOGS_CRAWLED: Metric = Metric::counter("tileseek.catalog.crawled")
        .with_description("Catalog pages fetched and scanned")
        .with_unit(Unit::Count);

    /// Catalog pages that could not be fetched.
    pub const CATALOG_FAILURES: Metric = Metric::counter("tileseek.catalog.failures")
        .with_description("Catalog pages that could not be fetched")
        .with_unit(Unit::Count);

    /// Descriptor links discovered across all catalogs.
    pub const DESCRIPTORS_DISCOVERED: Metric = Metric::counter("tileseek.catalog.descriptors_discovered")
        .with_description("Descriptor links discovered on catalog pages")
        .with_unit(Unit::Count);

    // ========================================================================
    // Descriptor resolution
    // ========================================================================

    /// Descriptor documents fetched successfully.
    pub const DESCRIPTORS_FETCHED: Metric = Metric::counter("tileseek.descriptor.fetched")
        .with_description("Descriptor documents fetched")
        .with_unit(Unit::Count);

    /// Descriptor fetch failures.
    ///
    /// Labels: reason (status, transport, timeout, session)
    pub const DESCRIPTOR_FETCH_FAILURES: Metric = Metric::counter("tileseek.descriptor.fetch_failures")
        .with_description("Descriptor documents that could not be fetched")
        .with_unit(Unit::Count);

    /// Descriptor parse failures.
    ///
    /// Labels: reason (malformed, missing_field, crs_mismatch)
    pub const DESCRIPTOR_PARSE_FAILURES: Metric = Metric::counter("tileseek.descriptor.parse_failures")
        .with_description("Descriptor documents that could not be parsed")
        .with_unit(Unit::Count);

    /// Descriptors whose bounding box contains the query point.
    pub const DESCRIPTOR_MATCHES: Metric = Metric::counter("tileseek.descriptor.matches")
        .with_description("Descriptors whose bounding box contains the query point")
        .with_unit(Unit::Count);

    /// Wall time to settle one batch.
    pub const BATCH_DURATION: Metric = Metric::histogram("tileseek.batch.duration_s")
        .with_description("Time to settle every task of one descriptor batch")
        .with_unit(Unit::Seconds);

    /// Tasks in the batch currently running.
    pub const BATCH_SIZE: Metric = Metric::gauge("tileseek.batch.size")
        .with_description("Number of descriptor tasks in the running batch")
        .with_unit(Unit::Count);

    /// All metrics, for bulk registration.
    pub const ALL: &[Metric] = &[
        INDEX_QUERIES,
        CATALOGS_CRAWLED,
        CATALOG_FAILURES,
        DESCRIPTORS_DISCOVERED,
        DESCRIPTORS_FETCHED,
        DESCRIPTOR_FETCH_FAILURES,
        DESCRIPTOR_PARSE_FAILURES,
        DESCRIPTOR_MATCHES,
        BATCH_DURATION,
        BATCH_SIZE,
    ];
}

/// Describes all resolver metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
