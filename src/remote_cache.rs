//! Networked cache backends: Redis and Memcached
//!
//! Both connect lazily on first use and retry the connection on the next
//! operation after a failure, so an unreachable cache server at startup only
//! costs misses.

use crate::cache::CacheBackend;
use crate::error::{Result, StatsError};
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Redis backend over a shared multiplexed connection
pub struct RedisCache {
    client: Client,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisCache {
    /// Create a new RedisCache; no connection is made until first use
    ///
    /// # Arguments
    /// * `url` - Redis connection URL, e.g. `redis://localhost:6379`
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| StatsError::Cache(format!("Redis client error: {}", e)))?;

        Ok(RedisCache {
            client,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = self
                    .client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| StatsError::Cache(format!("Redis connection error: {}", e)))?;
                info!("Connected to redis");
                Ok::<_, StatsError>(conn)
            })
            .await?;

        Ok(conn.clone())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.connection().await?;

        let result: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| StatsError::Cache(format!("Redis GET error: {}", e)))?;

        Ok(result.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;

        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value.as_ref(), seconds)
            .await
            .map_err(|e| StatsError::Cache(format!("Redis SETEX error: {}", e)))?;

        Ok(())
    }
}

/// Longest expiration memcached accepts as relative seconds; larger values
/// are read as absolute Unix timestamps
const MEMCACHED_MAX_RELATIVE_EXPIRATION: u64 = 30 * 24 * 60 * 60;

/// Encode a ttl as a memcached expiration
///
/// # Arguments
/// * `ttl` - Time to live
/// * `now_unix` - Current time in seconds since the Unix epoch
fn memcached_expiration(ttl: Duration, now_unix: u64) -> u32 {
    // zero means "never expires" to memcached
    let seconds = ttl.as_secs().max(1);
    let expiration = if seconds <= MEMCACHED_MAX_RELATIVE_EXPIRATION {
        seconds
    } else {
        now_unix.saturating_add(seconds)
    };

    u32::try_from(expiration).unwrap_or(u32::MAX)
}

/// Memcached backend over one or more servers
///
/// The memcache client is blocking, so every operation runs on the blocking
/// thread pool. Values are stored as text, which serialized documents always
/// are.
pub struct MemcachedCache {
    urls: Vec<String>,
    client: Arc<Mutex<Option<Arc<memcache::Client>>>>,
}

impl MemcachedCache {
    /// # Arguments
    /// * `servers` - `host:port` addresses
    pub fn new(servers: Vec<String>) -> Self {
        let urls = servers
            .into_iter()
            .map(|server| format!("memcache://{}", server))
            .collect();

        MemcachedCache {
            urls,
            client: Arc::new(Mutex::new(None)),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    fn connect(
        urls: &[String],
        slot: &Mutex<Option<Arc<memcache::Client>>>,
    ) -> Result<Arc<memcache::Client>> {
        let mut guard = slot
            .lock()
            .map_err(|_| StatsError::Cache("memcached client lock poisoned".to_string()))?;

        if let Some(client) = guard.as_ref() {
            return Ok(Arc::clone(client));
        }

        let client = memcache::Client::connect(urls.to_vec())
            .map_err(|e| StatsError::Cache(format!("Memcached connection error: {}", e)))?;
        info!("Connected to memcached: servers={}", urls.len());

        let client = Arc::new(client);
        *guard = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T> + Send + 'static,
    {
        let urls = self.urls.clone();
        let slot = Arc::clone(&self.client);

        tokio::task::spawn_blocking(move || {
            let client = Self::connect(&urls, &slot)?;
            op(&client)
        })
        .await
        .map_err(|e| StatsError::Internal(format!("memcached task failed: {}", e)))?
    }
}

#[async_trait]
impl CacheBackend for MemcachedCache {
    fn name(&self) -> &'static str {
        "memcached"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let key = key.to_string();

        let value = self
            .run_blocking(move |client| {
                client
                    .get::<String>(&key)
                    .map_err(|e| StatsError::Cache(format!("Memcached GET error: {}", e)))
            })
            .await?;

        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let key = key.to_string();
        let now_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let expiration = memcached_expiration(ttl, now_unix);
        debug!("Memcached SET: key={}, expiration={}s", key, expiration);

        self.run_blocking(move |client| {
            let value = std::str::from_utf8(&value)
                .map_err(|e| StatsError::Cache(format!("Memcached values must be UTF-8: {}", e)))?;
            client
                .set(&key, value, expiration)
                .map_err(|e| StatsError::Cache(format!("Memcached SET error: {}", e)))
        })
        .await
    }
}
