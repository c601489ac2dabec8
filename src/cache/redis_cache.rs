use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{CacheConnection, CacheConnector};
use crate::config::RedisSettings;
use crate::error::{AppError, Result};

/// Redis-backed cache store.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Only validates the URL; no connection is made until `connect`.
    pub fn from_settings(settings: &RedisSettings) -> Result<Self> {
        let client = redis::Client::open(settings.url()).map_err(AppError::Redis)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl CacheConnector for RedisCache {
    async fn connect(&self) -> Result<Box<dyn CacheConnection>> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(AppError::Redis)?;
        Ok(Box::new(RedisCacheConnection { conn }))
    }
}

pub struct RedisCacheConnection {
    conn: MultiplexedConnection,
}

#[async_trait]
impl CacheConnection for RedisCacheConnection {
    async fn ping(&mut self) -> Result<()> {
        redis::cmd("PING")
            .query_async::<_, ()>(&mut self.conn)
            .await
            .map_err(AppError::Redis)
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.conn.get(key).await.map_err(AppError::Redis)
    }

    async fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.conn
            .set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(AppError::Redis)
    }
}
