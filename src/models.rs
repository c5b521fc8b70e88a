//! Request-side data models: platforms, tags, API versions and views

use crate::error::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_64;

/// Gaming platform a player profile lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Pc,
    Psn,
    Xbl,
    NintendoSwitch,
}

impl Platform {
    /// Wire name used in routes, cache keys and upstream URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Pc => "pc",
            Platform::Psn => "psn",
            Platform::Xbl => "xbl",
            Platform::NintendoSwitch => "nintendo-switch",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pc" => Ok(Platform::Pc),
            "psn" => Ok(Platform::Psn),
            "xbl" => Ok(Platform::Xbl),
            "nintendo-switch" => Ok(Platform::NintendoSwitch),
            other => Err(StatsError::UnknownPlatform(other.to_string())),
        }
    }
}

/// A player's normalized, validated identity on a platform
///
/// The `#` separator users type in battle tags is replaced with `-`, which is
/// the form the upstream source and the cache keys use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerTag(String);

impl PlayerTag {
    /// Normalize and validate a raw tag for the given platform
    ///
    /// # Returns
    /// * `Ok(PlayerTag)` if the tag is well-formed for the platform
    /// * `Err(StatsError::InvalidTag)` otherwise
    pub fn parse(platform: Platform, raw: &str) -> Result<Self> {
        let tag = raw.trim().replace('#', "-");

        if tag.is_empty() {
            return Err(StatsError::InvalidTag("tag must not be empty".to_string()));
        }

        if tag.contains('/') || tag.chars().any(char::is_control) {
            return Err(StatsError::InvalidTag(format!(
                "tag contains invalid characters: {}",
                raw
            )));
        }

        if platform == Platform::Pc {
            let valid = match tag.rsplit_once('-') {
                Some((name, discriminator)) => {
                    !name.is_empty()
                        && !name.contains(char::is_whitespace)
                        && !discriminator.is_empty()
                        && discriminator.chars().all(|c| c.is_ascii_digit())
                }
                None => false,
            };

            if !valid {
                return Err(StatsError::InvalidTag(format!(
                    "pc tags must look like Name#1234, got: {}",
                    raw
                )));
            }
        }

        Ok(PlayerTag(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire-format generation of the API
///
/// - `V1`: games and awards totals only
/// - `V2`: adds the averaged `rating` and `ratingIcon`
/// - `V3`: additionally reshapes `ratings` into a role-keyed mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiVersion {
    V1,
    V2,
    V3,
}

impl ApiVersion {
    pub const LATEST: ApiVersion = ApiVersion::V3;

    pub fn number(&self) -> u8 {
        match self {
            ApiVersion::V1 => 1,
            ApiVersion::V2 => 2,
            ApiVersion::V3 => 3,
        }
    }

    /// Whether the averaged rating and its icon are part of this wire format
    pub fn includes_rating(&self) -> bool {
        *self >= ApiVersion::V2
    }

    /// Whether `ratings` is emitted as a role-keyed mapping
    pub fn keyed_ratings(&self) -> bool {
        *self >= ApiVersion::V3
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

impl FromStr for ApiVersion {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v1" => Ok(ApiVersion::V1),
            "v2" => Ok(ApiVersion::V2),
            "v3" => Ok(ApiVersion::V3),
            other => Err(StatsError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// Set of hero identifiers a client asked to keep
///
/// Identifiers are matched case-sensitively. Duplicates collapse and the set
/// is kept sorted so the cache key digest is order-independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroSelection {
    names: BTreeSet<String>,
}

impl HeroSelection {
    /// Parse a comma-separated hero list
    ///
    /// Empty segments are skipped; a list with no names left is rejected.
    pub fn parse(list: &str) -> Result<Self> {
        let names: BTreeSet<String> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(StatsError::InvalidHeroList(
                "name list must contain at least one hero".to_string(),
            ));
        }

        Ok(HeroSelection { names })
    }

    pub fn contains(&self, hero: &str) -> bool {
        self.names.contains(hero)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Hex digest of the sorted, comma-joined names
    pub fn digest(&self) -> String {
        let joined = self
            .names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        format!("{:016x}", xxh3_64(joined.as_bytes()))
    }
}

/// Named response shape, independent of the API version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// The full augmented document
    Complete,
    /// Summary only: per-mode `topHeroes` and `careerStats` removed
    Profile,
    /// Only the selected heroes' subtrees are kept
    Heroes(HeroSelection),
}

impl View {
    /// Suffix appended to the cache key for this view, if any
    pub fn cache_suffix(&self) -> Option<String> {
        match self {
            View::Complete => None,
            View::Profile => Some("profile".to_string()),
            View::Heroes(selection) => Some(format!("heroes-{}", selection.digest())),
        }
    }
}

/// A fully parsed stats request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRequest {
    pub version: ApiVersion,
    pub platform: Platform,
    pub tag: PlayerTag,
    pub view: View,
}

impl StatsRequest {
    pub fn new(version: ApiVersion, platform: Platform, tag: PlayerTag, view: View) -> Self {
        StatsRequest {
            version,
            platform,
            tag,
            view,
        }
    }

    /// Parse raw route parameters into a request
    ///
    /// All client-side validation happens here, before any cache or upstream
    /// access.
    pub fn parse(version: &str, platform: &str, tag: &str, view: View) -> Result<Self> {
        let version = version.parse::<ApiVersion>()?;
        let platform = platform.parse::<Platform>()?;
        let tag = PlayerTag::parse(platform, tag)?;
        Ok(StatsRequest::new(version, platform, tag, view))
    }

    pub fn cache_key(&self) -> String {
        crate::cache::generate_cache_key(self.version, self.platform, &self.tag, &self.view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip_names() {
        for platform in [
            Platform::Pc,
            Platform::Psn,
            Platform::Xbl,
            Platform::NintendoSwitch,
        ] {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
        assert!(matches!(
            "gamecube".parse::<Platform>(),
            Err(StatsError::UnknownPlatform(_))
        ));
    }

    #[test]
    fn test_pc_tag_normalization() {
        let tag = PlayerTag::parse(Platform::Pc, "cats#11481").unwrap();
        assert_eq!(tag.as_str(), "cats-11481");

        let tag = PlayerTag::parse(Platform::Pc, "cats-11481").unwrap();
        assert_eq!(tag.as_str(), "cats-11481");
    }

    #[test]
    fn test_pc_tag_requires_discriminator() {
        assert!(PlayerTag::parse(Platform::Pc, "cats").is_err());
        assert!(PlayerTag::parse(Platform::Pc, "cats#").is_err());
        assert!(PlayerTag::parse(Platform::Pc, "#1234").is_err());
        assert!(PlayerTag::parse(Platform::Pc, "cats#12a4").is_err());
    }

    #[test]
    fn test_console_tag_shape() {
        assert!(PlayerTag::parse(Platform::Psn, "SomeGamer").is_ok());
        assert!(PlayerTag::parse(Platform::Xbl, "").is_err());
        assert!(PlayerTag::parse(Platform::Xbl, "a/b").is_err());
        assert!(PlayerTag::parse(Platform::Xbl, "Major Nelson").is_ok());
        assert!(PlayerTag::parse(Platform::Pc, "ca ts#1234").is_err());
    }

    #[test]
    fn test_api_version_capabilities() {
        assert!(!ApiVersion::V1.includes_rating());
        assert!(ApiVersion::V2.includes_rating());
        assert!(!ApiVersion::V2.keyed_ratings());
        assert!(ApiVersion::V3.keyed_ratings());
        assert_eq!("v2".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert!("v4".parse::<ApiVersion>().is_err());
        assert_eq!(ApiVersion::LATEST.to_string(), "v3");
    }

    #[test]
    fn test_hero_selection_parse() {
        let selection = HeroSelection::parse("reaper,ashe,ashe").unwrap();
        assert_eq!(selection.len(), 2);
        assert!(selection.contains("ashe"));
        assert!(!selection.contains("Ashe"));
        assert_eq!(selection.names().collect::<Vec<_>>(), vec!["ashe", "reaper"]);
    }

    #[test]
    fn test_empty_hero_selection_rejected() {
        for list in ["", ",", " , ,"] {
            let err = HeroSelection::parse(list).unwrap_err();
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn test_hero_digest_is_order_independent() {
        let a = HeroSelection::parse("ashe,reaper").unwrap();
        let b = HeroSelection::parse("reaper,ashe").unwrap();
        let c = HeroSelection::parse("ashe").unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 16);
    }

    #[test]
    fn test_request_parse_rejects_before_io() {
        assert!(StatsRequest::parse("v9", "pc", "cats#1", View::Complete).is_err());
        assert!(StatsRequest::parse("v1", "wii", "cats#1", View::Complete).is_err());
        assert!(StatsRequest::parse("v1", "pc", "cats", View::Complete).is_err());
        assert!(StatsRequest::parse("v1", "pc", "cats#1", View::Complete).is_ok());
    }
}
