//! Cache provider: a uniform get/set-with-ttl contract over a selectable backend
//!
//! The backend is chosen once at startup from a scheme-qualified descriptor:
//!
//! | Descriptor                         | Backend                         |
//! |------------------------------------|---------------------------------|
//! | `redis://host:port`                | [`RedisCache`]                  |
//! | `memcached://h1:p1,h2:p2`          | [`MemcachedCache`]              |
//! | `memory://?size=N`, `gcache://...` | [`MemoryCache`] (in-process LRU) |
//! | `none`, anything else, unparsable  | [`NullCache`] (always misses)   |
//!
//! Caching is an optimization only. [`CacheProvider`] absorbs every backend
//! fault: read errors are reported as a miss and write errors are dropped.
//! Concurrent misses on the same key are not coalesced; each request fetches
//! and writes independently and the last write wins.

use crate::error::Result;
use crate::memory_cache::MemoryCache;
use crate::metrics::StatsMetrics;
use crate::models::{ApiVersion, Platform, PlayerTag, View};
use crate::remote_cache::{MemcachedCache, RedisCache};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default entry capacity of the in-process cache
pub const DEFAULT_MEMORY_CAPACITY: usize = 128;

/// Generate the cache key for a request
///
/// Format: `v{N}-{platform}-{tag}` followed by `-profile` or
/// `-heroes-{digest}` for filtered views. The version is part of the key
/// because each version stores a differently shaped document.
pub fn generate_cache_key(
    version: ApiVersion,
    platform: Platform,
    tag: &PlayerTag,
    view: &View,
) -> String {
    let mut key = format!("v{}-{}-{}", version.number(), platform, tag);
    if let Some(suffix) = view.cache_suffix() {
        key.push('-');
        key.push_str(&suffix);
    }
    key
}

/// Storage backend behind the cache provider
///
/// Backends report their faults; the provider decides they are not fatal.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Look up a value, `Ok(None)` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store a value that expires after `ttl`
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;
}

/// Backend that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

#[async_trait]
impl CacheBackend for NullCache {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}

/// Parsed cache connection descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDescriptor {
    None,
    Memory { capacity: usize },
    Redis { url: String },
    Memcached { servers: Vec<String> },
}

impl CacheDescriptor {
    /// Parse a descriptor such as `redis://localhost:6379`
    ///
    /// A bare word (`none`, `memory`) is read as a scheme with no address.
    /// Unknown schemes and descriptors that cannot be parsed select
    /// [`CacheDescriptor::None`].
    pub fn parse(uri: &str) -> Self {
        let uri = uri.trim();

        let (scheme, rest) = match uri.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => (uri.to_ascii_lowercase(), ""),
        };

        let (authority, query) = match rest.split_once('?') {
            Some((head, query)) => (head, query),
            None => (rest, ""),
        };
        let authority = authority.split('/').next().unwrap_or_default();

        match scheme.as_str() {
            "redis" | "rediss" if !authority.is_empty() => CacheDescriptor::Redis {
                url: uri.to_string(),
            },
            "memcached" => {
                let servers: Vec<String> = authority
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if servers.is_empty() {
                    CacheDescriptor::None
                } else {
                    CacheDescriptor::Memcached { servers }
                }
            }
            "memory" | "gcache" => CacheDescriptor::Memory {
                capacity: query_param(query, "size")
                    .and_then(|size| size.parse::<usize>().ok())
                    .filter(|size| *size > 0)
                    .unwrap_or(DEFAULT_MEMORY_CAPACITY),
            },
            _ => CacheDescriptor::None,
        }
    }
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Fault-absorbing front of a cache backend
///
/// Cheap to clone; all clones share the backend handle, which must be safe
/// for concurrent use.
#[derive(Clone)]
pub struct CacheProvider {
    backend: Arc<dyn CacheBackend>,
    metrics: Option<Arc<StatsMetrics>>,
}

impl CacheProvider {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        CacheProvider {
            backend,
            metrics: None,
        }
    }

    /// Provider that never caches
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullCache))
    }

    /// Select and construct a backend from a connection descriptor
    pub fn for_uri(uri: &str) -> Self {
        let backend: Arc<dyn CacheBackend> = match CacheDescriptor::parse(uri) {
            CacheDescriptor::None => Arc::new(NullCache),
            CacheDescriptor::Memory { capacity } => Arc::new(MemoryCache::new(capacity)),
            CacheDescriptor::Redis { url } => match RedisCache::new(&url) {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    warn!("Invalid redis descriptor, caching disabled: {}", e);
                    Arc::new(NullCache)
                }
            },
            CacheDescriptor::Memcached { servers } => Arc::new(MemcachedCache::new(servers)),
        };

        info!("Cache backend selected: {}", backend.name());
        Self::new(backend)
    }

    /// Record cache faults in the given metrics
    pub fn with_metrics(mut self, metrics: Arc<StatsMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Look up a key; backend errors are reported as a miss
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        match self.backend.get(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit: key={}, size={}", key, value.len());
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss: key={}", key);
                None
            }
            Err(e) => {
                warn!("Cache read failed, treating as miss: key={}, error={}", key, e);
                self.record_error();
                None
            }
        }
    }

    /// Best-effort write; a zero ttl skips the write entirely
    ///
    /// # Returns
    /// `true` if the backend accepted the value
    pub async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }

        match self.backend.set(key, value, ttl).await {
            Ok(()) => {
                debug!("Cache write: key={}, ttl={}s", key, ttl.as_secs());
                true
            }
            Err(e) => {
                warn!("Cache write failed, ignoring: key={}, error={}", key, e);
                self.record_error();
                false
            }
        }
    }

    fn record_error(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_error();
        }
    }
}
