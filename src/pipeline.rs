//! Read-through response pipeline
//!
//! For each request the pipeline derives the cache key and consults the
//! cache. A hit only has the view filter applied. A miss fetches the player
//! from the upstream source, augments the document with derived fields,
//! writes the augmented document through to the cache and then applies the
//! view filter.
//!
//! The cache always holds the augmented, unfiltered document; filtering is
//! redone on every read so a cached copy serves any view of the same key.

use crate::cache::CacheProvider;
use crate::derived;
use crate::error::{Result, StatsError};
use crate::metrics::StatsMetrics;
use crate::models::StatsRequest;
use crate::patch;
use crate::registry::HeroRegistry;
use crate::source::StatsSource;
use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Orchestrates cache, upstream source, augmentation and view filtering
///
/// Holds no per-request state; one instance is shared by every request.
pub struct StatsPipeline {
    cache: CacheProvider,
    source: Arc<dyn StatsSource>,
    registry: Arc<HeroRegistry>,
    ttl: Duration,
    metrics: Arc<StatsMetrics>,
}

impl StatsPipeline {
    /// Create a new pipeline
    ///
    /// # Arguments
    /// * `cache` - Cache provider for augmented documents
    /// * `source` - Upstream stats source
    /// * `registry` - Known heroes, used by hero-subset views
    /// * `ttl` - Lifetime of cached documents; zero disables write-through
    pub fn new(
        cache: CacheProvider,
        source: Arc<dyn StatsSource>,
        registry: Arc<HeroRegistry>,
        ttl: Duration,
    ) -> Self {
        let metrics = Arc::new(StatsMetrics::new());
        StatsPipeline {
            cache: cache.with_metrics(Arc::clone(&metrics)),
            source,
            registry,
            ttl,
            metrics,
        }
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: Arc<StatsMetrics>) -> Self {
        self.cache = self.cache.with_metrics(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<StatsMetrics> {
        &self.metrics
    }

    pub fn registry(&self) -> &HeroRegistry {
        &self.registry
    }

    /// Serve one request
    ///
    /// # Returns
    /// * `Ok(Bytes)` - the serialized, augmented and filtered document
    /// * `Err(StatsError::PlayerNotFound)` if the upstream does not know the player
    /// * `Err(StatsError)` for upstream and patch failures
    pub async fn handle(&self, request: &StatsRequest) -> Result<Bytes> {
        let start = Instant::now();
        let result = self.serve(request).await;
        self.metrics.record_request(start.elapsed());

        if let Err(e) = &result {
            match e {
                StatsError::PlayerNotFound => self.metrics.record_not_found(),
                StatsError::Patch(_) => self.metrics.record_patch_failure(),
                e if e.is_client_error() => self.metrics.record_client_error(),
                _ => {}
            }
            debug!(
                "Request failed: {}/{} {} {:?}: {}",
                request.platform, request.tag, request.version, request.view, e
            );
        }

        result
    }

    async fn serve(&self, request: &StatsRequest) -> Result<Bytes> {
        let key = request.cache_key();

        let mut doc = match self.cached(&key).await {
            Some(doc) => doc,
            None => self.fetch_augmented(request, &key).await?,
        };

        if let Some(filter) = patch::view_filter(&request.view, &self.registry) {
            filter.apply(&mut doc)?;
        }

        Ok(Bytes::from(serde_json::to_vec(&doc)?))
    }

    /// Cached augmented document; undecodable entries count as misses
    async fn cached(&self, key: &str) -> Option<Value> {
        let Some(bytes) = self.cache.get(key).await else {
            self.metrics.record_cache_miss();
            return None;
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(doc) => {
                self.metrics.record_cache_hit();
                Some(doc)
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry: key={}, error={}", key, e);
                self.metrics.record_cache_miss();
                None
            }
        }
    }

    async fn fetch_augmented(&self, request: &StatsRequest, key: &str) -> Result<Value> {
        let start = Instant::now();
        let fetched = self.source.fetch(request.platform, &request.tag).await;
        self.metrics
            .record_upstream_fetch(fetched.is_ok(), start.elapsed());
        let doc = fetched?;

        let derived = derived::compute(&doc);
        let augmentation = patch::augmentation(&doc, &derived, request.version)?;

        let mut tree = doc.into_tree();
        augmentation.apply(&mut tree)?;
        debug!(
            "Augmented document: key={}, operations={}",
            key,
            augmentation.len()
        );

        if !self.ttl.is_zero() {
            let bytes = Bytes::from(serde_json::to_vec(&tree)?);
            if self.cache.set(key, bytes, self.ttl).await {
                self.metrics.record_cache_write();
            }
        }

        Ok(tree)
    }
}

/// JSON error envelope returned to callers
pub fn error_body(err: &StatsError) -> Bytes {
    Bytes::from(json!({ "error": err.to_string() }).to_string())
}
