//! Configuration management for the player stats service

use crate::error::{Result, StatsError};
use crate::models::{Platform, PlayerTag};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsConfig {
    /// Address the HTTP server listens on (default: "0.0.0.0:8080")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Cache connection descriptor (default: "redis://localhost:6379")
    /// Use "none" to disable caching
    #[serde(default = "default_cache_uri")]
    pub cache_uri: String,

    /// Cache TTL in seconds (default: 600)
    /// 0 disables write-through caching
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    /// Base URL of the upstream stats source
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Upstream request timeout in seconds (default: 10)
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,

    /// Representative player used to populate the hero registry
    #[serde(default)]
    pub hero_seed: HeroSeedConfig,

    /// Metrics endpoint configuration (optional)
    #[serde(default)]
    pub metrics_endpoint: Option<MetricsEndpointConfig>,
}

/// Player whose document seeds the hero registry at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroSeedConfig {
    #[serde(default = "default_seed_platform")]
    pub platform: Platform,

    #[serde(default = "default_seed_tag")]
    pub tag: String,
}

/// Configuration for the `/metrics` route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsEndpointConfig {
    /// Whether to serve `/metrics` (default: false)
    #[serde(default)]
    pub enabled: bool,
}

impl Default for HeroSeedConfig {
    fn default() -> Self {
        HeroSeedConfig {
            platform: default_seed_platform(),
            tag: default_seed_tag(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_cache_uri() -> String {
    "redis://localhost:6379".to_string()
}

fn default_cache_ttl() -> u64 {
    600 // 10 minutes
}

fn default_upstream_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

fn default_seed_platform() -> Platform {
    Platform::Pc
}

fn default_seed_tag() -> String {
    "cats-11481".to_string()
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            bind_address: default_bind_address(),
            cache_uri: default_cache_uri(),
            cache_ttl: default_cache_ttl(),
            upstream_url: default_upstream_url(),
            upstream_timeout_secs: default_upstream_timeout(),
            hero_seed: HeroSeedConfig::default(),
            metrics_endpoint: None,
        }
    }
}

impl StatsConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    /// * `Ok(StatsConfig)` if loading and validation succeed
    /// * `Err(StatsError)` if the file cannot be read or the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| StatsError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: StatsConfig = serde_yaml::from_str(content)
            .map_err(|e| StatsError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - bind_address must be a socket address
    /// - upstream_url must be an http(s) URL
    /// - upstream_timeout_secs must be > 0
    /// - hero_seed.tag must be a valid tag for hero_seed.platform
    pub fn validate(&self) -> Result<()> {
        self.bind_address.parse::<SocketAddr>().map_err(|e| {
            StatsError::Config(format!(
                "bind_address '{}' is not a socket address: {}",
                self.bind_address, e
            ))
        })?;

        let upstream = reqwest::Url::parse(&self.upstream_url).map_err(|e| {
            StatsError::Config(format!(
                "upstream_url '{}' is invalid: {}",
                self.upstream_url, e
            ))
        })?;
        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(StatsError::Config(format!(
                "upstream_url must use http or https, got {}",
                upstream.scheme()
            )));
        }

        if self.upstream_timeout_secs == 0 {
            return Err(StatsError::Config(
                "upstream_timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.seed_tag()
            .map_err(|e| StatsError::Config(format!("hero_seed: {}", e)))?;

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Normalized tag of the hero registry seed player
    pub fn seed_tag(&self) -> Result<PlayerTag> {
        PlayerTag::parse(self.hero_seed.platform, &self.hero_seed.tag)
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_endpoint
            .as_ref()
            .map(|endpoint| endpoint.enabled)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StatsConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.cache_uri, "redis://localhost:6379");
        assert_eq!(config.cache_ttl, 600);
        assert_eq!(config.upstream_timeout_secs, 10);
        assert_eq!(config.hero_seed.platform, Platform::Pc);
        assert!(!config.metrics_enabled());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(StatsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_cache_ttl_is_valid() {
        let config = StatsConfig {
            cache_ttl: 0,
            ..StatsConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.cache_ttl().is_zero());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = StatsConfig {
            upstream_timeout_secs: 0,
            ..StatsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_bind_address() {
        let config = StatsConfig {
            bind_address: "localhost".to_string(),
            ..StatsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_upstream() {
        let config = StatsConfig {
            upstream_url: "ftp://stats.example.com".to_string(),
            ..StatsConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StatsConfig {
            upstream_url: "not a url".to_string(),
            ..StatsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_seed_tag() {
        let config = StatsConfig {
            hero_seed: HeroSeedConfig {
                platform: Platform::Pc,
                tag: "no-discriminator-x".to_string(),
            },
            ..StatsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = StatsConfig::from_yaml(
            r#"
cache_uri: "memory://?size=64"
hero_seed:
  platform: nintendo-switch
  tag: somebody
metrics_endpoint:
  enabled: true
"#,
        )
        .unwrap();

        assert_eq!(config.cache_uri, "memory://?size=64");
        assert_eq!(config.cache_ttl, 600);
        assert_eq!(config.hero_seed.platform, Platform::NintendoSwitch);
        assert!(config.metrics_enabled());
    }
}
