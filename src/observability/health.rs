use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::services::ConnectionProvider;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Outcome of a single dependency probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

impl CheckStatus {
    fn from_probe(passed: bool) -> Self {
        if passed {
            CheckStatus::Ok
        } else {
            CheckStatus::Error
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Ok)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChecks {
    pub store: CheckStatus,
    pub cache: CheckStatus,
}

/// Body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub checks: DependencyChecks,
}

impl HealthReport {
    pub fn new(checks: DependencyChecks) -> Self {
        let status = if checks.store.is_ok() && checks.cache.is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            checks,
        }
    }

    /// The service can serve traffic as long as the store answers.
    pub fn is_ready(&self) -> bool {
        self.checks.store.is_ok()
    }
}

/// Probes the store and the cache through the same path requests use, so
/// the connection-status gauges are refreshed by every health check.
pub struct HealthChecker {
    connections: ConnectionProvider,
}

impl HealthChecker {
    pub fn new(connections: ConnectionProvider) -> Self {
        Self { connections }
    }

    pub async fn check_all(&self) -> HealthReport {
        let store = self.check_store().await;
        let cache = self.check_cache().await;
        HealthReport::new(DependencyChecks { store, cache })
    }

    /// Acquire plus `SELECT 1`.
    pub async fn check_store(&self) -> CheckStatus {
        let Some(mut conn) = self.connections.acquire_store().await else {
            return CheckStatus::Error;
        };

        match conn.ping().await {
            Ok(()) => CheckStatus::Ok,
            Err(e) => {
                tracing::error!(error = %e, "Store health probe failed");
                CheckStatus::Error
            }
        }
    }

    /// Acquire already includes the PING.
    pub async fn check_cache(&self) -> CheckStatus {
        CheckStatus::from_probe(self.connections.acquire_cache().await.is_some())
    }
}
