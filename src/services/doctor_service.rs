use crate::cache::CacheConnection;
use crate::config::CacheSettings;
use crate::error::{AppError, Result};
use crate::models::DoctorList;

use super::ConnectionProvider;

/// Doctor listing with a Redis cache-aside layer in front of the store.
pub struct DoctorService {
    connections: ConnectionProvider,
    settings: CacheSettings,
}

impl DoctorService {
    pub fn new(connections: ConnectionProvider, settings: CacheSettings) -> Self {
        Self {
            connections,
            settings,
        }
    }

    /// Returns the serialized `{doctors, count}` payload.
    /// First checks cache, then falls back to the store and repopulates the cache.
    pub async fn list_available(&self) -> Result<String> {
        let key = self.settings.doctors_key.as_str();
        let mut cache = self.connections.acquire_cache().await;

        if let Some(conn) = cache.as_mut() {
            if let Some(cached) = self.read_cached(conn.as_mut(), key).await {
                tracing::info!(key = key, "doctors served from cache");
                return Ok(cached);
            }
        }

        let mut store = self
            .connections
            .acquire_store()
            .await
            .ok_or(AppError::StoreUnavailable)?;

        let doctors = store.available_doctors().await?;
        let payload = serde_json::to_string(&DoctorList::new(doctors))?;

        if let Some(conn) = cache.as_mut() {
            self.write_back(conn.as_mut(), key, &payload).await;
        }

        Ok(payload)
    }

    /// A failed read counts as a miss.
    async fn read_cached(&self, conn: &mut dyn CacheConnection, key: &str) -> Option<String> {
        let metrics = self.connections.metrics();
        match conn.get(key).await {
            Ok(Some(payload)) => {
                metrics.record_cache_lookup(key, true);
                Some(payload)
            }
            Ok(None) => {
                metrics.record_cache_lookup(key, false);
                None
            }
            Err(e) => {
                metrics.record_cache_lookup(key, false);
                tracing::warn!(key = key, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Best effort: a failed write never fails the read that triggered it.
    async fn write_back(&self, conn: &mut dyn CacheConnection, key: &str, payload: &str) {
        let ttl = self.settings.doctors_ttl_secs;
        match conn.set_ex(key, payload, ttl).await {
            Ok(()) => tracing::debug!(key = key, ttl_secs = ttl, "cached payload"),
            Err(e) => tracing::warn!(key = key, error = %e, "cache write failed"),
        }
    }
}
