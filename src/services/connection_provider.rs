use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheConnection, CacheConnector};
use crate::error::{AppError, Result};
use crate::observability::AppMetrics;
use crate::repositories::{StoreConnection, StoreConnector};

/// Hands out request-scoped store and cache connections, keeping the
/// connection-status gauges current on every attempt.
#[derive(Clone)]
pub struct ConnectionProvider {
    store: Arc<dyn StoreConnector>,
    cache: Arc<dyn CacheConnector>,
    metrics: Arc<AppMetrics>,
    store_timeout: Duration,
    cache_timeout: Duration,
}

impl ConnectionProvider {
    pub fn new(
        store: Arc<dyn StoreConnector>,
        cache: Arc<dyn CacheConnector>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            store_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeouts(mut self, store_timeout: Duration, cache_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self.cache_timeout = cache_timeout;
        self
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    /// Returns `None` when the store is unreachable; the failure is logged.
    pub async fn acquire_store(&self) -> Option<Box<dyn StoreConnection>> {
        match bounded(self.store_timeout, self.store.connect()).await {
            Ok(conn) => {
                self.metrics.set_store_connected(true);
                Some(conn)
            }
            Err(e) => {
                self.metrics.set_store_connected(false);
                tracing::error!(error = %e, "MySQL connection failed");
                None
            }
        }
    }

    /// Returns `None` unless the cache both accepts a connection and answers PING.
    pub async fn acquire_cache(&self) -> Option<Box<dyn CacheConnection>> {
        let attempt = async {
            let mut conn = self.cache.connect().await?;
            conn.ping().await?;
            Ok::<_, AppError>(conn)
        };

        match bounded(self.cache_timeout, attempt).await {
            Ok(conn) => {
                self.metrics.set_cache_connected(true);
                Some(conn)
            }
            Err(e) => {
                self.metrics.set_cache_connected(false);
                tracing::error!(error = %e, "Redis connection failed");
                None
            }
        }
    }
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AppError::Timeout(limit))?
}
