pub mod redis_cache;

pub use redis_cache::{RedisCache, RedisCacheConnection};

use async_trait::async_trait;

use crate::error::Result;

/// Opens connections to the cache store.
#[async_trait]
pub trait CacheConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn CacheConnection>>;
}

/// A cache connection owned by one request.
#[async_trait]
pub trait CacheConnection: Send {
    /// Liveness probe; a connection is only reported usable after this succeeds.
    async fn ping(&mut self) -> Result<()>;

    async fn get(&mut self, key: &str) -> Result<Option<String>>;

    async fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}
