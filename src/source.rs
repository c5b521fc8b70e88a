//! Upstream player statistics source

use crate::document::StatsDocument;
use crate::error::{Result, StatsError};
use crate::models::{Platform, PlayerTag};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetches a player's raw statistics
///
/// Implementations must be safe to call concurrently from many requests.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch the stats document for a player
    ///
    /// # Returns
    /// * `Ok(StatsDocument)` on success
    /// * `Err(StatsError::PlayerNotFound)` if the player does not exist
    /// * any other error for network or parse failures
    async fn fetch(&self, platform: Platform, tag: &PlayerTag) -> Result<StatsDocument>;
}

/// StatsSource backed by an HTTP service that serves stats documents as JSON
///
/// Documents are requested from `{base_url}/stats/{platform}/{tag}`.
pub struct HttpStatsSource {
    client: Client,
    base_url: String,
}

impl HttpStatsSource {
    /// Create a new HttpStatsSource with a 10 second timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    /// Create a new HttpStatsSource with a custom timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatsError::Upstream(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(HttpStatsSource { client, base_url })
    }

    pub fn player_url(&self, platform: Platform, tag: &PlayerTag) -> String {
        format!(
            "{}/stats/{}/{}",
            self.base_url,
            platform,
            urlencoding::encode(tag.as_str())
        )
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn fetch(&self, platform: Platform, tag: &PlayerTag) -> Result<StatsDocument> {
        let url = self.player_url(platform, tag);
        debug!("Fetching stats from upstream: url={}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Upstream request failed for url={}: {}", url, e);
            if e.is_timeout() {
                StatsError::Timeout(format!("request to {} timed out", url))
            } else {
                StatsError::Upstream(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Upstream reports player not found: {}/{}", platform, tag);
            return Err(StatsError::PlayerNotFound);
        }

        if !status.is_success() {
            warn!("Upstream returned status={} for url={}", status, url);
            return Err(StatsError::Upstream(format!(
                "unexpected status code: {}",
                status
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            warn!("Failed to read upstream body for url={}: {}", url, e);
            StatsError::Upstream(format!("failed to read response body: {}", e))
        })?;

        let doc = StatsDocument::from_slice(&body)
            .map_err(|e| StatsError::Upstream(format!("invalid stats document: {}", e)))?;

        info!(
            "Fetched stats for {}/{}: {} bytes",
            platform,
            tag,
            body.len()
        );

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_creation() {
        let source = HttpStatsSource::new("http://localhost:9000/");
        assert!(source.is_ok());
    }

    #[test]
    fn test_player_url() {
        let source = HttpStatsSource::new("http://localhost:9000/").unwrap();
        let tag = PlayerTag::parse(Platform::Pc, "cats#11481").unwrap();
        assert_eq!(
            source.player_url(Platform::Pc, &tag),
            "http://localhost:9000/stats/pc/cats-11481"
        );

        let tag = PlayerTag::parse(Platform::Xbl, "Major Nelson").unwrap();
        assert_eq!(
            source.player_url(Platform::Xbl, &tag),
            "http://localhost:9000/stats/xbl/Major%20Nelson"
        );
    }
}
