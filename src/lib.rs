//! Player Stats Cache
//!
//! A read-through caching and response-shaping layer in front of a player
//! statistics source. Requests name a player, an API version and a view; the
//! answer is the player's stats document augmented with derived fields and
//! shaped for that version and view.
//!
//! # Overview
//!
//! - **Cache provider** ([`CacheProvider`]): uniform get/set-with-ttl over a
//!   Redis, Memcached, in-process LRU or no-op backend chosen from a
//!   descriptor. Backend faults never fail a request.
//! - **Hero registry** ([`HeroRegistry`]): the set of known hero identifiers,
//!   populated once at startup from a representative player.
//! - **Derived fields** ([`derived`]): per-mode games and awards totals, the
//!   averaged competitive rating and its rank icon.
//! - **Patches** ([`patch`]): RFC 6902 operation lists for augmentation,
//!   version-specific ratings reshaping, and profile or hero-subset filtering,
//!   applied atomically.
//! - **Pipeline** ([`StatsPipeline`]): cache key, cache read, upstream fetch on
//!   miss, augmentation, write-through, view filter.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use player_stats_cache::{
//!     CacheProvider, HeroRegistry, HttpStatsSource, StatsPipeline, StatsRequest, View,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> player_stats_cache::Result<()> {
//! let source = Arc::new(HttpStatsSource::new("http://localhost:9000")?);
//! let pipeline = StatsPipeline::new(
//!     CacheProvider::for_uri("memory://?size=256"),
//!     source,
//!     Arc::new(HeroRegistry::new(["ashe", "reaper"])),
//!     Duration::from_secs(600),
//! );
//!
//! let request = StatsRequest::parse("v3", "pc", "cats#11481", View::Profile)?;
//! let body = pipeline.handle(&request).await?;
//! println!("{}", String::from_utf8_lossy(&body));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! The server binary reads a YAML file:
//!
//! ```yaml
//! bind_address: "0.0.0.0:8080"
//! cache_uri: "redis://localhost:6379"
//! cache_ttl: 600                 # seconds, 0 disables caching
//! upstream_url: "http://localhost:9000"
//! upstream_timeout_secs: 10
//! hero_seed:
//!   platform: pc
//!   tag: cats-11481
//! metrics_endpoint:
//!   enabled: true
//! ```
//!
//! See [`StatsConfig`] for details.

pub mod cache;
pub mod config;
pub mod derived;
pub mod document;
pub mod error;
pub mod memory_cache;
pub mod metrics;
pub mod models;
pub mod patch;
pub mod pipeline;
pub mod registry;
pub mod remote_cache;
pub mod server;
pub mod source;

// Re-export commonly used types
pub use cache::{generate_cache_key, CacheBackend, CacheDescriptor, CacheProvider, NullCache};
pub use config::StatsConfig;
pub use derived::{DerivedFields, RankTier, RatingSummary};
pub use document::{GameMode, StatsDocument};
pub use error::{Result, StatsError};
pub use memory_cache::MemoryCache;
pub use metrics::{MetricsSnapshot, StatsMetrics};
pub use models::{ApiVersion, HeroSelection, Platform, PlayerTag, StatsRequest, View};
pub use patch::{Patch, PatchOperation};
pub use pipeline::StatsPipeline;
pub use registry::HeroRegistry;
pub use remote_cache::{MemcachedCache, RedisCache};
pub use server::StatsServer;
pub use source::{HttpStatsSource, StatsSource};
