use metrics::Gauge;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::registry::{CounterVec, GaugeVec, HistogramVec, MetricsRegistry, RegistryError};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const HTTP_REQUESTS_IN_PROGRESS: &str = "http_requests_in_progress";
pub const DB_CONNECTION_STATUS: &str = "medassist_db_connection_status";
pub const REDIS_CONNECTION_STATUS: &str = "medassist_redis_connection_status";
pub const PAYMENT_ERRORS_TOTAL: &str = "medassist_payment_errors_total";
pub const CONSULTATIONS_TOTAL: &str = "medassist_consultations_total";
pub const CACHE_LOOKUPS_TOTAL: &str = "medassist_cache_lookups_total";

/// Request latency buckets in seconds.
pub const DURATION_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Metric families recorded by the service.
#[derive(Debug, Clone)]
pub struct AppMetrics {
    registry: Arc<MetricsRegistry>,
    requests_total: CounterVec,
    request_duration: HistogramVec,
    requests_in_progress: GaugeVec,
    db_connection_status: GaugeVec,
    redis_connection_status: GaugeVec,
    payment_errors: CounterVec,
    consultations: CounterVec,
    cache_lookups: CounterVec,
}

impl AppMetrics {
    pub fn new(registry: Arc<MetricsRegistry>) -> Result<Self, RegistryError> {
        let requests_total = registry.counter(
            HTTP_REQUESTS_TOTAL,
            "Total HTTP requests",
            &["method", "endpoint", "status"],
        )?;
        let request_duration = registry.histogram(
            HTTP_REQUEST_DURATION,
            "HTTP request duration in seconds",
            &["method", "endpoint"],
            DURATION_BUCKETS,
        )?;
        let requests_in_progress = registry.gauge(
            HTTP_REQUESTS_IN_PROGRESS,
            "Number of HTTP requests currently in progress",
            &["method", "endpoint"],
        )?;
        let db_connection_status = registry.gauge(
            DB_CONNECTION_STATUS,
            "MySQL connection status (1=connected, 0=disconnected)",
            &[],
        )?;
        let redis_connection_status = registry.gauge(
            REDIS_CONNECTION_STATUS,
            "Redis connection status (1=connected, 0=disconnected)",
            &[],
        )?;
        let payment_errors = registry.counter(
            PAYMENT_ERRORS_TOTAL,
            "Total payment processing errors",
            &[],
        )?;
        let consultations = registry.counter(
            CONSULTATIONS_TOTAL,
            "Total consultations by outcome",
            &["status"],
        )?;
        let cache_lookups = registry.counter(
            CACHE_LOOKUPS_TOTAL,
            "Cache lookups by key and result",
            &["key", "result"],
        )?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            requests_in_progress,
            db_connection_status,
            redis_connection_status,
            payment_errors,
            consultations,
            cache_lookups,
        })
    }

    /// Builds the metric set on a fresh, private registry.
    pub fn standalone() -> Result<Self, RegistryError> {
        Self::new(Arc::new(MetricsRegistry::new()))
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn record_http_request(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.requests_total
            .with_labels(&[method, endpoint, &status])
            .increment(1);
        self.request_duration
            .with_labels(&[method, endpoint])
            .record(elapsed.as_secs_f64());
    }

    pub fn in_flight(&self, method: &str, endpoint: &str) -> Gauge {
        self.requests_in_progress.with_labels(&[method, endpoint])
    }

    pub fn set_store_connected(&self, connected: bool) {
        self.db_connection_status
            .with_labels(&[])
            .set(if connected { 1.0 } else { 0.0 });
    }

    pub fn set_cache_connected(&self, connected: bool) {
        self.redis_connection_status
            .with_labels(&[])
            .set(if connected { 1.0 } else { 0.0 });
    }

    pub fn record_payment_failure(&self) {
        self.payment_errors.with_labels(&[]).increment(1);
        self.record_consultation("payment_failed");
    }

    pub fn record_payment_success(&self) {
        self.record_consultation("payment_success");
    }

    pub fn record_consultation(&self, status: &str) {
        self.consultations.with_labels(&[status]).increment(1);
    }

    pub fn record_cache_lookup(&self, key: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups.with_labels(&[key, result]).increment(1);
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        self.registry.snapshot()
    }
}

/// Timer for measuring operation latency.
#[derive(Debug, Clone, Copy)]
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}
