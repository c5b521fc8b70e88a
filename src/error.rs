//! Error types for the player stats cache

use thiserror::Error;

/// Result type alias for stats operations
pub type Result<T> = std::result::Result<T, StatsError>;

/// Error types that can occur while serving a stats request
#[derive(Error, Debug, Clone)]
pub enum StatsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidHeroList(String),

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unsupported API version: {0}")]
    UnsupportedVersion(String),

    #[error("Player not found")]
    PlayerNotFound,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timeout: {0}")]
    Timeout(String),

    #[error("Patch error: {0}")]
    Patch(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for StatsError {
    fn from(err: std::io::Error) -> Self {
        StatsError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Serialization(err.to_string())
    }
}

impl StatsError {
    /// Whether the error was caused by a malformed request
    ///
    /// Client errors are raised before the cache or the upstream source is
    /// touched.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StatsError::InvalidHeroList(_)
                | StatsError::InvalidTag(_)
                | StatsError::UnknownPlatform(_)
                | StatsError::UnsupportedVersion(_)
        )
    }

    /// Whether the upstream source reported that the player does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StatsError::PlayerNotFound)
    }

    /// Convert error to HTTP status code
    ///
    /// - Client errors: 400 Bad Request
    /// - Unknown player: 404 Not Found
    /// - Upstream failures: 502 Bad Gateway (504 on timeout)
    /// - Everything else: 500 Internal Server Error
    pub fn to_http_status(&self) -> u16 {
        match self {
            StatsError::InvalidHeroList(_)
            | StatsError::InvalidTag(_)
            | StatsError::UnknownPlatform(_)
            | StatsError::UnsupportedVersion(_) => 400,

            StatsError::PlayerNotFound => 404,

            StatsError::Upstream(_) => 502,
            StatsError::Timeout(_) => 504,

            StatsError::Config(_)
            | StatsError::Patch(_)
            | StatsError::Cache(_)
            | StatsError::Serialization(_)
            | StatsError::Io(_)
            | StatsError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        let errors = [
            StatsError::InvalidHeroList("empty".to_string()),
            StatsError::InvalidTag("x".to_string()),
            StatsError::UnknownPlatform("gamecube".to_string()),
            StatsError::UnsupportedVersion("v9".to_string()),
        ];

        for err in errors {
            assert!(err.is_client_error(), "{err} should be a client error");
            assert_eq!(err.to_http_status(), 400);
        }
    }

    #[test]
    fn test_not_found_is_distinct() {
        let err = StatsError::PlayerNotFound;
        assert!(err.is_not_found());
        assert!(!err.is_client_error());
        assert_eq!(err.to_http_status(), 404);

        assert!(!StatsError::Upstream("boom".to_string()).is_not_found());
    }

    #[test]
    fn test_patch_error_is_generic_failure() {
        let err = StatsError::Patch("path not found".to_string());
        assert!(!err.is_client_error());
        assert_eq!(err.to_http_status(), 500);
    }

    #[test]
    fn test_serde_json_conversion() {
        let err: StatsError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, StatsError::Serialization(_)));
    }
}
