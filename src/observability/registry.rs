//! Injectable metrics registry backed by a private `prometheus::Registry`.
//!
//! Families are registered once with a fixed label schema. Series are created
//! lazily the first time a label-value tuple is used and live as long as the
//! registry. Update handles are the `metrics` crate's `Counter`, `Gauge` and
//! `Histogram`, forwarding to the prometheus series underneath.

use metrics::{Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn};
use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::proto;
use prometheus::{Encoder, HistogramOpts, Opts, TextEncoder};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("invalid metric name '{0}'")]
    InvalidName(String),

    #[error("invalid label name '{label}' for metric '{metric}'")]
    InvalidLabel { metric: String, label: String },

    #[error("metric '{0}' is already registered with a different shape")]
    ShapeMismatch(String),

    #[error("histogram '{0}' needs finite, strictly increasing bucket boundaries")]
    InvalidBuckets(String),

    #[error("metric '{metric}' expects {expected} label values, got {actual}")]
    LabelArity {
        metric: String,
        expected: usize,
        actual: usize,
    },

    #[error("prometheus: {0}")]
    Prometheus(String),
}

impl From<prometheus::Error> for RegistryError {
    fn from(err: prometheus::Error) -> Self {
        RegistryError::Prometheus(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Counter,
    Gauge,
    Histogram(Vec<f64>),
}

struct IntCounterCell(prometheus::IntCounter);

impl CounterFn for IntCounterCell {
    fn increment(&self, value: u64) {
        self.0.inc_by(value);
    }

    fn absolute(&self, value: u64) {
        let current = self.0.get();
        if value > current {
            self.0.inc_by(value - current);
        }
    }
}

struct GaugeCell(prometheus::Gauge);

impl GaugeFn for GaugeCell {
    fn increment(&self, value: f64) {
        self.0.add(value);
    }

    fn decrement(&self, value: f64) {
        self.0.sub(value);
    }

    fn set(&self, value: f64) {
        self.0.set(value);
    }
}

struct HistogramCell(prometheus::Histogram);

impl HistogramFn for HistogramCell {
    fn record(&self, value: f64) {
        if value.is_nan() || value < 0.0 {
            return;
        }
        self.0.observe(value);
    }
}

/// Point-in-time view of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper bound, cumulative count)`; the final entry has an infinite bound.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

/// Current value of a single series.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Counter(u64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
}

impl SampleValue {
    fn read(kind: &Kind, metric: &proto::Metric) -> Self {
        match kind {
            Kind::Counter => SampleValue::Counter(metric.get_counter().get_value() as u64),
            Kind::Gauge => SampleValue::Gauge(metric.get_gauge().get_value()),
            Kind::Histogram(_) => {
                let h = metric.get_histogram();
                let mut buckets: Vec<(f64, u64)> = h
                    .get_bucket()
                    .iter()
                    .map(|b| (b.get_upper_bound(), b.get_cumulative_count()))
                    .collect();
                buckets.push((f64::INFINITY, h.get_sample_count()));
                SampleValue::Histogram(HistogramSnapshot {
                    buckets,
                    sum: h.get_sample_sum(),
                    count: h.get_sample_count(),
                })
            }
        }
    }
}

#[derive(Clone)]
enum Family {
    Counter(prometheus::IntCounterVec),
    Gauge(prometheus::GaugeVec),
    Histogram(prometheus::HistogramVec),
}

impl Family {
    fn collector(&self) -> Box<dyn Collector> {
        match self {
            Family::Counter(vec) => Box::new(vec.clone()),
            Family::Gauge(vec) => Box::new(vec.clone()),
            Family::Histogram(vec) => Box::new(vec.clone()),
        }
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        match self {
            Family::Counter(vec) => vec.collect(),
            Family::Gauge(vec) => vec.collect(),
            Family::Histogram(vec) => vec.collect(),
        }
    }
}

struct Entry {
    kind: Kind,
    label_names: Vec<String>,
    family: Family,
}

impl Entry {
    fn same_shape(&self, label_names: &[&str], kind: &Kind) -> bool {
        &self.kind == kind
            && self.label_names.len() == label_names.len()
            && self.label_names.iter().zip(label_names).all(|(a, b)| a == b)
    }

    /// Label pairs come back sorted by name, so match by name rather than position.
    fn matches(&self, metric: &proto::Metric, label_values: &[&str]) -> bool {
        let pairs = metric.get_label();
        pairs.len() == label_values.len()
            && self.label_names.iter().zip(label_values).all(|(name, value)| {
                pairs
                    .iter()
                    .any(|pair| pair.get_name() == name.as_str() && pair.get_value() == *value)
            })
    }
}

/// Process-local metrics registry. Cheap to share behind an `Arc`.
pub struct MetricsRegistry {
    registry: prometheus::Registry,
    families: RwLock<HashMap<String, Entry>>,
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.families.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("MetricsRegistry")
            .field("families", &names)
            .finish()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            registry: prometheus::Registry::new(),
            families: RwLock::new(HashMap::new()),
        }
    }

    pub fn counter(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<CounterVec, RegistryError> {
        let family = self.register(name, label_names, Kind::Counter, || {
            let vec = prometheus::IntCounterVec::new(Opts::new(name, help), label_names)?;
            if label_names.is_empty() {
                vec.get_metric_with_label_values(&[])?;
            }
            Ok(Family::Counter(vec))
        })?;
        match family {
            Family::Counter(inner) => Ok(CounterVec::new(name, label_names.len(), inner)),
            _ => Err(RegistryError::ShapeMismatch(name.to_string())),
        }
    }

    pub fn gauge(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<GaugeVec, RegistryError> {
        let family = self.register(name, label_names, Kind::Gauge, || {
            let vec = prometheus::GaugeVec::new(Opts::new(name, help), label_names)?;
            if label_names.is_empty() {
                vec.get_metric_with_label_values(&[])?;
            }
            Ok(Family::Gauge(vec))
        })?;
        match family {
            Family::Gauge(inner) => Ok(GaugeVec::new(name, label_names.len(), inner)),
            _ => Err(RegistryError::ShapeMismatch(name.to_string())),
        }
    }

    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<HistogramVec, RegistryError> {
        let valid = !buckets.is_empty()
            && buckets.iter().all(|b| b.is_finite())
            && buckets.windows(2).all(|w| w[0] < w[1]);
        if !valid {
            return Err(RegistryError::InvalidBuckets(name.to_string()));
        }
        let kind = Kind::Histogram(buckets.to_vec());
        let family = self.register(name, label_names, kind, || {
            let opts = HistogramOpts::new(name, help).buckets(buckets.to_vec());
            let vec = prometheus::HistogramVec::new(opts, label_names)?;
            if label_names.is_empty() {
                vec.get_metric_with_label_values(&[])?;
            }
            Ok(Family::Histogram(vec))
        })?;
        match family {
            Family::Histogram(inner) => Ok(HistogramVec::new(name, label_names.len(), inner)),
            _ => Err(RegistryError::ShapeMismatch(name.to_string())),
        }
    }

    fn register(
        &self,
        name: &str,
        label_names: &[&str],
        kind: Kind,
        build: impl FnOnce() -> Result<Family, RegistryError>,
    ) -> Result<Family, RegistryError> {
        if !is_valid_metric_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        for label in label_names {
            if !is_valid_label_name(label) {
                return Err(RegistryError::InvalidLabel {
                    metric: name.to_string(),
                    label: label.to_string(),
                });
            }
        }

        let mut families = self.families.write();
        if let Some(existing) = families.get(name) {
            return if existing.same_shape(label_names, &kind) {
                Ok(existing.family.clone())
            } else {
                Err(RegistryError::ShapeMismatch(name.to_string()))
            };
        }

        let family = build()?;
        self.registry.register(family.collector())?;
        families.insert(
            name.to_string(),
            Entry {
                kind,
                label_names: label_names.iter().map(|l| l.to_string()).collect(),
                family: family.clone(),
            },
        );
        Ok(family)
    }

    /// Reads the current value of one series, if it has been observed.
    pub fn sample(&self, name: &str, label_values: &[&str]) -> Option<SampleValue> {
        let families = self.families.read();
        let entry = families.get(name)?;
        entry.family.collect().iter().find_map(|mf| {
            mf.get_metric()
                .iter()
                .find(|metric| entry.matches(metric, label_values))
                .map(|metric| SampleValue::read(&entry.kind, metric))
        })
    }

    pub fn counter_value(&self, name: &str, label_values: &[&str]) -> Option<u64> {
        match self.sample(name, label_values)? {
            SampleValue::Counter(v) => Some(v),
            _ => None,
        }
    }

    pub fn gauge_value(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        match self.sample(name, label_values)? {
            SampleValue::Gauge(v) => Some(v),
            _ => None,
        }
    }

    pub fn histogram_value(&self, name: &str, label_values: &[&str]) -> Option<HistogramSnapshot> {
        match self.sample(name, label_values)? {
            SampleValue::Histogram(h) => Some(h),
            _ => None,
        }
    }

    /// Renders every family with at least one series in text exposition format.
    ///
    /// Families come out sorted by name and series by label values.
    pub fn snapshot(&self) -> String {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&families, &mut buffer) {
            tracing::error!(error = %e, "metrics encoding failed");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

macro_rules! family_handle {
    ($vec:ident, $inner:ty, $handle:ident, $cell:ident) => {
        #[derive(Clone)]
        pub struct $vec {
            name: Arc<str>,
            arity: usize,
            inner: $inner,
        }

        impl fmt::Debug for $vec {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($vec))
                    .field("name", &self.name)
                    .field("arity", &self.arity)
                    .finish()
            }
        }

        impl $vec {
            fn new(name: &str, arity: usize, inner: $inner) -> Self {
                Self {
                    name: Arc::from(name),
                    arity,
                    inner,
                }
            }

            pub fn name(&self) -> &str {
                &self.name
            }

            pub fn try_with_labels(&self, values: &[&str]) -> Result<$handle, RegistryError> {
                if values.len() != self.arity {
                    return Err(RegistryError::LabelArity {
                        metric: self.name.to_string(),
                        expected: self.arity,
                        actual: values.len(),
                    });
                }
                let series = self.inner.get_metric_with_label_values(values)?;
                Ok($handle::from_arc(Arc::new($cell(series))))
            }

            /// Like `try_with_labels`, but a bad label tuple yields a no-op handle.
            pub fn with_labels(&self, values: &[&str]) -> $handle {
                self.try_with_labels(values).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "dropping metric update");
                    $handle::noop()
                })
            }
        }
    };
}

family_handle!(CounterVec, prometheus::IntCounterVec, Counter, IntCounterCell);
family_handle!(GaugeVec, prometheus::GaugeVec, Gauge, GaugeCell);
family_handle!(HistogramVec, prometheus::HistogramVec, Histogram, HistogramCell);

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `le` is reserved for histogram buckets on every family kind.
fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != "le" && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
