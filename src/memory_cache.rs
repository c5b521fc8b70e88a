//! In-process LRU cache backend
//!
//! Entries carry their own expiration. The cache holds at most `capacity`
//! entries; inserting into a full cache first drops expired entries and then
//! evicts the least recently used one.

use crate::cache::CacheBackend;
use crate::error::{Result, StatsError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cached entry with expiration and access tracking
#[derive(Clone)]
struct CacheEntry {
    data: Bytes,
    /// `None` when the ttl does not fit in an `Instant`
    expires_at: Option<Instant>,
    last_accessed: u64,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCacheStats {
    pub total_entries: usize,
    pub total_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct MemoryCache {
    storage: RwLock<HashMap<String, CacheEntry>>,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCache {
    /// Create a new MemoryCache
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries; clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        MemoryCache {
            storage: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get cache statistics
    pub fn get_stats(&self) -> MemoryCacheStats {
        let (total_entries, total_bytes) = match self.storage.read() {
            Ok(storage) => (
                storage.len(),
                storage.values().map(|entry| entry.data.len()).sum(),
            ),
            Err(_) => (0, 0),
        };

        MemoryCacheStats {
            total_entries,
            total_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Make room for one more entry
    fn make_room(&self, storage: &mut HashMap<String, CacheEntry>, now: Instant) {
        storage.retain(|_, entry| entry.is_live(now));

        while storage.len() >= self.capacity {
            let oldest = storage
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());

            let Some(key) = oldest else {
                break;
            };

            storage.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("LRU eviction: key={}", key);
        }
    }

    fn lock_error() -> StatsError {
        StatsError::Cache("memory cache lock poisoned".to_string())
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let now = Instant::now();
        let mut storage = self.storage.write().map_err(|_| Self::lock_error())?;

        let expired = match storage.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.last_accessed = self.tick();
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.data.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            storage.remove(key);
            debug!("Cache entry expired: key={}", key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut storage = self.storage.write().map_err(|_| Self::lock_error())?;

        if !storage.contains_key(key) && storage.len() >= self.capacity {
            self.make_room(&mut storage, now);
        }

        storage.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                expires_at: now.checked_add(ttl),
                last_accessed: self.tick(),
            },
        );

        Ok(())
    }
}
