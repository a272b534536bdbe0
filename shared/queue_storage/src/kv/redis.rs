//! Redis implementation of the atomic key-value interface

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::time::timeout;

use super::{AtomicKv, KvError, KvResult};

const REDIS_TIMEOUT: Duration = Duration::from_secs(3);

/// Atomic key-value store backed by Redis (`ElastiCache` in production)
#[derive(Clone)]
pub struct RedisKv {
    connection_manager: ConnectionManager,
}

impl RedisKv {
    /// Creates a new Redis client with connection manager
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis URL is invalid or the initial
    /// connection fails
    pub async fn connect(url: &str) -> KvResult<Self> {
        let client = Client::open(url)?;
        let connection_manager = ConnectionManager::new(client).await?;

        Ok(Self { connection_manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.connection_manager.clone()
    }

    async fn with_timeout<T>(
        fut: impl std::future::Future<Output = redis::RedisResult<T>> + Send,
    ) -> KvResult<T> {
        timeout(REDIS_TIMEOUT, fut)
            .await
            .map_err(|_| KvError::Timeout)?
            .map_err(KvError::from)
    }
}

#[async_trait]
impl AtomicKv for RedisKv {
    async fn increment(&self, key: &str, ttl_secs: u64) -> KvResult<i64> {
        let mut conn = self.conn();
        // INCR and EXPIRE in one MULTI/EXEC so the counter never outlives
        // its day
        let (value, _): (i64, i64) = Self::with_timeout(
            redis::pipe()
                .atomic()
                .incr(key, 1)
                .expire(key, i64::try_from(ttl_secs).unwrap_or(86_400))
                .query_async(&mut conn),
        )
        .await?;

        Ok(value)
    }

    async fn list_push(&self, key: &str, value: &str) -> KvResult<()> {
        let mut conn = self.conn();
        Self::with_timeout(conn.rpush::<_, _, ()>(key, value)).await
    }

    async fn list_pop(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.conn();
        Self::with_timeout(conn.lpop::<_, Option<String>>(key, None)).await
    }

    async fn list_len(&self, key: &str) -> KvResult<u64> {
        let mut conn = self.conn();
        Self::with_timeout(conn.llen::<_, u64>(key)).await
    }

    async fn list_position(&self, key: &str, value: &str) -> KvResult<Option<u64>> {
        let mut conn = self.conn();
        Self::with_timeout(conn.lpos::<_, _, Option<u64>>(
            key,
            value,
            redis::LposOptions::default(),
        ))
        .await
    }

    async fn list_remove(&self, key: &str, value: &str) -> KvResult<()> {
        let mut conn = self.conn();
        Self::with_timeout(conn.lrem::<_, _, ()>(key, 1, value)).await
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.conn();
        Self::with_timeout(conn.get::<_, Option<String>>(key)).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()> {
        let mut conn = self.conn();
        Self::with_timeout(conn.set_ex::<_, _, ()>(key, value, ttl_secs)).await
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let mut conn = self.conn();
        Self::with_timeout(conn.del::<_, ()>(key)).await
    }
}
