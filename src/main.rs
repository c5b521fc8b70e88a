//! Player Stats Cache Server
//!
//! Loads configuration, sets up logging, populates the hero registry and
//! starts the HTTP server.

use player_stats_cache::{
    CacheProvider, HeroRegistry, HttpStatsSource, StatsConfig, StatsPipeline, StatsServer,
    StatsSource,
};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// # Usage
/// ```bash
/// # Start with default config (ow-stats.yaml)
/// player-stats-cache
///
/// # Start with custom config
/// player-stats-cache /path/to/config.yaml
/// ```
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Player Stats Cache Server");

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "ow-stats.yaml".to_string());

    let config = if Path::new(&config_path).exists() {
        info!("Loading configuration from: {}", config_path);
        match StatsConfig::from_file(&config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        warn!(
            "Configuration file {} not found, using defaults",
            config_path
        );
        StatsConfig::default()
    };

    info!("Configuration loaded successfully");
    info!("  - Bind address: {}", config.bind_address);
    info!("  - Cache: {}", config.cache_uri);
    info!("  - Cache TTL: {} seconds", config.cache_ttl);
    info!("  - Upstream: {}", config.upstream_url);
    info!("  - Metrics endpoint: {}", config.metrics_enabled());

    let addr: SocketAddr = match config.bind_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}: {}", config.bind_address, e);
            std::process::exit(1);
        }
    };

    let source: Arc<dyn StatsSource> =
        match HttpStatsSource::with_timeout(&config.upstream_url, config.upstream_timeout()) {
            Ok(source) => Arc::new(source),
            Err(e) => {
                error!("Failed to create upstream client: {}", e);
                std::process::exit(1);
            }
        };

    let registry = match config.seed_tag() {
        Ok(tag) => HeroRegistry::load(source.as_ref(), config.hero_seed.platform, &tag).await,
        Err(e) => {
            warn!("Invalid hero seed tag, hero filtering disabled: {}", e);
            HeroRegistry::empty()
        }
    };

    let pipeline = StatsPipeline::new(
        CacheProvider::for_uri(&config.cache_uri),
        source,
        Arc::new(registry),
        config.cache_ttl(),
    );

    let server = StatsServer::new(Arc::new(pipeline))
        .with_metrics_endpoint(config.metrics_enabled());

    if let Err(e) = server.start(addr).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
