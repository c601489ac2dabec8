pub mod health;
pub mod logging;
pub mod metrics;
pub mod registry;

pub use health::{CheckStatus, DependencyChecks, HealthChecker, HealthReport, HealthStatus};
pub use logging::{init_logging, JsonLogLayer, LogConfig, LogFormat, LogRecord};
pub use metrics::{AppMetrics, LatencyTimer};
pub use registry::{
    CounterVec, GaugeVec, HistogramSnapshot, HistogramVec, MetricsRegistry, RegistryError,
    SampleValue,
};
