//! Key/value blob store backing the report cache.
//!
//! Two implementations: [`RedisCache`] for deployments and [`MemoryCache`]
//! for tests and single-process runs.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::Mutex;

use crate::ResultEngine;

/// Opaque byte storage keyed by string.
#[async_trait]
pub trait BlobCache: Send + Sync {
    async fn exists(&self, key: &str) -> ResultEngine<bool>;
    async fn get(&self, key: &str) -> ResultEngine<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> ResultEngine<()>;
    async fn delete(&self, key: &str) -> ResultEngine<()>;
}

/// Process-local cache. Entries never expire.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobCache for MemoryCache {
    async fn exists(&self, key: &str) -> ResultEngine<bool> {
        Ok(self.entries.lock().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> ResultEngine<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> ResultEngine<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ResultEngine<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Redis-backed cache sharing one multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Opens the client and establishes the managed connection.
    pub async fn connect(url: &str) -> ResultEngine<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        tracing::info!("connected to redis report cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl BlobCache for RedisCache {
    async fn exists(&self, key: &str) -> ResultEngine<bool> {
        let mut conn = self.connection.clone();
        Ok(conn.exists(key).await?)
    }

    async fn get(&self, key: &str) -> ResultEngine<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> ResultEngine<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> ResultEngine<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;

    #[tokio::test]
    async fn memory_cache_set_get_delete() {
        let cache = MemoryCache::new();
        assert!(!cache.exists("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", b"v1".to_vec()).await.unwrap();
        cache.set("k", b"v2".to_vec()).await.unwrap();
        assert!(cache.exists("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v2".to_vec()));

        cache.delete("k").await.unwrap();
        assert!(!cache.exists("k").await.unwrap());
    }
    #[tokio::test]
    async fn unreachable_redis_is_a_cache_error() {
        // Nothing listens on port 1; the manager gives up after its retries.
        let err = RedisCache::connect("redis://127.0.0.1:1/").await.err();
        assert!(matches!(err, Some(EngineError::Cache(_))), "{err:?}");
    }
}
