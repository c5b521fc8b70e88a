//! Upstream stats document and the typed views the core reads from it
//!
//! The document itself stays an opaque JSON tree. Only three subtrees are
//! decoded: each mode's `careerStats.allHeroes` totals, and the per-role
//! `ratings`. Numeric fields in those subtrees are normalized to a single
//! integer representation ([`Counter`]) as they are decoded, so nothing
//! downstream has to care how the upstream chose to encode a number.

use crate::error::{Result, StatsError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Career-stats key holding the totals across every hero
pub const ALL_HEROES: &str = "allHeroes";

/// Game mode section of a stats document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    QuickPlay,
    Competitive,
}

impl GameMode {
    pub const ALL: [GameMode; 2] = [GameMode::QuickPlay, GameMode::Competitive];

    /// Top-level document key of this mode's stats
    pub fn key(&self) -> &'static str {
        match self {
            GameMode::QuickPlay => "quickPlayStats",
            GameMode::Competitive => "competitiveStats",
        }
    }
}

/// An integer statistic normalized from whatever JSON the upstream sent
///
/// Integers are taken as-is, floats with no fractional part are truncated to
/// integers, and anything else (strings, fractions, out-of-range values, null)
/// becomes 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Counter(pub i64);

impl Counter {
    pub fn from_value(value: &Value) -> Self {
        let Value::Number(n) = value else {
            return Counter(0);
        };

        if let Some(i) = n.as_i64() {
            return Counter(i);
        }

        if let Some(u) = n.as_u64() {
            return Counter(i64::try_from(u).unwrap_or(0));
        }

        match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Counter(f as i64)
            }
            _ => Counter(0),
        }
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Counter {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Counter::from_value(&value))
    }
}

/// Deserialize a stat map, treating anything but an object as empty
fn lenient_counters<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, Counter>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, Counter::from_value(&value)))
            .collect(),
        _ => HashMap::new(),
    })
}

/// Totals from a mode's `careerStats.allHeroes` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerTotals {
    #[serde(default, deserialize_with = "lenient_counters")]
    pub game: HashMap<String, Counter>,

    #[serde(default, deserialize_with = "lenient_counters")]
    pub match_awards: HashMap<String, Counter>,
}

impl CareerTotals {
    pub fn game_stat(&self, key: &str) -> i64 {
        self.game.get(key).copied().unwrap_or_default().get()
    }

    pub fn award_stat(&self, key: &str) -> i64 {
        self.match_awards.get(key).copied().unwrap_or_default().get()
    }
}

/// One per-role competitive rating as reported upstream
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRating {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub level: Counter,

    #[serde(default)]
    pub rank_icon: Option<String>,
}

/// A player's stats document as returned by the upstream source
#[derive(Debug, Clone, PartialEq)]
pub struct StatsDocument {
    tree: Value,
}

impl StatsDocument {
    /// Wrap a JSON tree, which must be an object
    pub fn from_value(tree: Value) -> Result<Self> {
        if !tree.is_object() {
            return Err(StatsError::Upstream(
                "stats document must be a JSON object".to_string(),
            ));
        }
        Ok(StatsDocument { tree })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let tree: Value = serde_json::from_slice(bytes)?;
        Self::from_value(tree)
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn into_tree(self) -> Value {
        self.tree
    }

    /// Decode the `allHeroes` career totals for a mode
    ///
    /// Returns `None` when the mode has no `allHeroes` entry (or it is null).
    /// An entry whose shape cannot be decoded yields all-zero totals.
    pub fn career_totals(&self, mode: GameMode) -> Option<CareerTotals> {
        let entry = self
            .tree
            .get(mode.key())?
            .get("careerStats")?
            .get(ALL_HEROES)?;

        if entry.is_null() {
            return None;
        }

        Some(CareerTotals::deserialize(entry).unwrap_or_default())
    }

    /// Per-role ratings; entries that are not objects are skipped
    pub fn ratings(&self) -> Vec<RoleRating> {
        self.rating_entries()
            .iter()
            .filter_map(|entry| RoleRating::deserialize(*entry).ok())
            .collect()
    }

    /// Raw rating entries in upstream order
    pub fn rating_entries(&self) -> Vec<&Value> {
        match self.tree.get("ratings") {
            Some(Value::Array(entries)) => entries.iter().filter(|e| e.is_object()).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the document carries a `ratings` member at all
    pub fn has_ratings_member(&self) -> bool {
        self.tree.get("ratings").is_some()
    }
}
