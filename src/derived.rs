//! Derived fields computed from a raw stats document
//!
//! The upstream source reports per-hero career stats and per-role ratings, but
//! not the aggregate counters or the overall rating clients want. This module
//! computes those values; [`crate::patch`] turns them into patch operations.

use crate::document::{CareerTotals, GameMode, StatsDocument};
use serde::Serialize;

/// Marker inside upstream rank icon URLs that precedes the icon filename
pub const RANK_ICON_MARKER: &str = "rank-icons/";

/// Competitive tier, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RankTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
    Grandmaster,
}

impl RankTier {
    /// Inclusive lower bounds, highest first
    const THRESHOLDS: [(i64, RankTier); 7] = [
        (4000, RankTier::Grandmaster),
        (3500, RankTier::Master),
        (3000, RankTier::Diamond),
        (2500, RankTier::Platinum),
        (2000, RankTier::Gold),
        (1500, RankTier::Silver),
        (0, RankTier::Bronze),
    ];

    /// Tier for a rating; the highest tier whose lower bound is met wins
    pub fn for_rating(rating: i64) -> RankTier {
        Self::THRESHOLDS
            .iter()
            .find(|(lower, _)| rating >= *lower)
            .map(|(_, tier)| *tier)
            .unwrap_or(RankTier::Bronze)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RankTier::Bronze => "Bronze",
            RankTier::Silver => "Silver",
            RankTier::Gold => "Gold",
            RankTier::Platinum => "Platinum",
            RankTier::Diamond => "Diamond",
            RankTier::Master => "Master",
            RankTier::Grandmaster => "Grandmaster",
        }
    }

    /// Icon filename served next to the upstream rank icons
    pub fn icon_filename(&self) -> String {
        format!("rank-{}Tier.png", self.name())
    }
}

/// Games played and won in one mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GamesStats {
    pub played: i64,
    pub won: i64,
}

/// Match awards in one mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardsStats {
    pub cards: i64,
    pub medals: i64,
    pub medals_bronze: i64,
    pub medals_silver: i64,
    pub medals_gold: i64,
}

/// Aggregate counters for a mode that has an `allHeroes` entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeTotals {
    pub games: GamesStats,
    pub awards: AwardsStats,
}

impl From<&CareerTotals> for ModeTotals {
    fn from(totals: &CareerTotals) -> Self {
        ModeTotals {
            games: GamesStats {
                played: totals.game_stat("gamesPlayed"),
                won: totals.game_stat("gamesWon"),
            },
            awards: AwardsStats {
                cards: totals.award_stat("cards"),
                medals: totals.award_stat("medals"),
                medals_bronze: totals.award_stat("medalsBronze"),
                medals_silver: totals.award_stat("medalsSilver"),
                medals_gold: totals.award_stat("medalsGold"),
            },
        }
    }
}

/// Averaged rating and the icon of its tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingSummary {
    pub rating: i64,
    pub icon: String,
}

/// Everything the augmentation patch adds to a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFields {
    pub quick_play: Option<ModeTotals>,
    pub competitive: Option<ModeTotals>,
    pub rating: RatingSummary,
}

impl DerivedFields {
    pub fn mode(&self, mode: GameMode) -> Option<&ModeTotals> {
        match mode {
            GameMode::QuickPlay => self.quick_play.as_ref(),
            GameMode::Competitive => self.competitive.as_ref(),
        }
    }
}

/// Compute every derived field for a document
pub fn compute(doc: &StatsDocument) -> DerivedFields {
    DerivedFields {
        quick_play: mode_totals(doc, GameMode::QuickPlay),
        competitive: mode_totals(doc, GameMode::Competitive),
        rating: rating_summary(doc),
    }
}

/// Aggregate games/awards for a mode, `None` without an `allHeroes` entry
pub fn mode_totals(doc: &StatsDocument, mode: GameMode) -> Option<ModeTotals> {
    doc.career_totals(mode).as_ref().map(ModeTotals::from)
}

/// Average the per-role ratings and synthesize the tier icon
///
/// With no ratings the summary is `rating = 0`, `icon = ""`. The icon stays
/// empty as well when no rating icon URL contains [`RANK_ICON_MARKER`].
pub fn rating_summary(doc: &StatsDocument) -> RatingSummary {
    let ratings = doc.ratings();
    let Ok(count) = i64::try_from(ratings.len()) else {
        return RatingSummary::default();
    };
    if count == 0 {
        return RatingSummary::default();
    }

    let total: i64 = ratings
        .iter()
        .fold(0i64, |acc, r| acc.saturating_add(r.level.get()));
    let rating = total.div_euclid(count);

    let base = ratings
        .iter()
        .filter_map(|r| r.rank_icon.as_deref())
        .find_map(icon_base);

    let icon = match base {
        Some(base) => format!("{}{}", base, RankTier::for_rating(rating).icon_filename()),
        None => String::new(),
    };

    RatingSummary { rating, icon }
}

/// URL prefix up to and including the rank icon marker
fn icon_base(url: &str) -> Option<&str> {
    url.find(RANK_ICON_MARKER)
        .map(|idx| &url[..idx + RANK_ICON_MARKER.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ICON: &str = "https://static.example.com/rank-icons/rank-GoldTier.png";

    fn doc(value: serde_json::Value) -> StatsDocument {
        StatsDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(RankTier::for_rating(0), RankTier::Bronze);
        assert_eq!(RankTier::for_rating(1499), RankTier::Bronze);
        assert_eq!(RankTier::for_rating(1500), RankTier::Silver);
        assert_eq!(RankTier::for_rating(2000), RankTier::Gold);
        assert_eq!(RankTier::for_rating(2500), RankTier::Platinum);
        assert_eq!(RankTier::for_rating(2999), RankTier::Platinum);
        assert_eq!(RankTier::for_rating(3000), RankTier::Diamond);
        assert_eq!(RankTier::for_rating(3500), RankTier::Master);
        assert_eq!(RankTier::for_rating(4000), RankTier::Grandmaster);
        assert_eq!(RankTier::for_rating(5000), RankTier::Grandmaster);
        assert_eq!(RankTier::for_rating(-10), RankTier::Bronze);
    }

    #[test]
    fn test_icon_filename() {
        assert_eq!(RankTier::Diamond.icon_filename(), "rank-DiamondTier.png");
    }

    #[test]
    fn test_rating_average_truncates() {
        let d = doc(json!({
            "ratings": [
                { "role": "tank", "level": 2999, "rankIcon": ICON },
                { "role": "damage", "level": 3000, "rankIcon": ICON }
            ]
        }));

        let summary = rating_summary(&d);
        assert_eq!(summary.rating, 2999);
        assert_eq!(
            summary.icon,
            "https://static.example.com/rank-icons/rank-PlatinumTier.png"
        );
    }

    #[test]
    fn test_rating_at_threshold_uses_higher_tier() {
        let d = doc(json!({
            "ratings": [{ "role": "support", "level": 3000, "rankIcon": ICON }]
        }));

        let summary = rating_summary(&d);
        assert_eq!(summary.rating, 3000);
        assert!(summary.icon.ends_with("rank-DiamondTier.png"));
    }

    #[test]
    fn test_no_ratings() {
        let summary = rating_summary(&doc(json!({ "ratings": [] })));
        assert_eq!(summary, RatingSummary::default());

        let summary = rating_summary(&doc(json!({ "ratings": null })));
        assert_eq!(summary.rating, 0);
        assert_eq!(summary.icon, "");
    }

    #[test]
    fn test_icon_without_marker_is_empty() {
        let d = doc(json!({
            "ratings": [{ "role": "tank", "level": 2200, "rankIcon": "https://cdn.example.com/other.png" }]
        }));

        let summary = rating_summary(&d);
        assert_eq!(summary.rating, 2200);
        assert_eq!(summary.icon, "");
    }

    #[test]
    fn test_icon_from_any_rating_with_marker() {
        let d = doc(json!({
            "ratings": [
                { "role": "tank", "level": 1000 },
                { "role": "damage", "level": 1000, "rankIcon": ICON }
            ]
        }));

        assert_eq!(
            rating_summary(&d).icon,
            "https://static.example.com/rank-icons/rank-BronzeTier.png"
        );
    }

    #[test]
    fn test_mode_totals() {
        let d = doc(json!({
            "quickPlayStats": {
                "careerStats": {
                    "allHeroes": {
                        "game": { "gamesPlayed": 10, "gamesWon": 6 },
                        "matchAwards": { "cards": 3, "medals": 20, "medalsBronze": 5, "medalsSilver": 7, "medalsGold": 8 }
                    }
                }
            },
            "competitiveStats": { "careerStats": {} }
        }));

        let derived = compute(&d);
        let qp = derived.quick_play.unwrap();
        assert_eq!(qp.games, GamesStats { played: 10, won: 6 });
        assert_eq!(qp.awards.medals_gold, 8);
        assert_eq!(qp.awards.cards, 3);
        assert!(derived.competitive.is_none());
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let d = doc(json!({
            "competitiveStats": { "careerStats": { "allHeroes": { "game": { "gamesPlayed": 4 } } } }
        }));

        let totals = mode_totals(&d, GameMode::Competitive).unwrap();
        assert_eq!(totals.games.played, 4);
        assert_eq!(totals.games.won, 0);
        assert_eq!(totals.awards, AwardsStats::default());
    }

    #[test]
    fn test_awards_serialize_camel_case() {
        let value = serde_json::to_value(AwardsStats {
            cards: 1,
            medals: 2,
            medals_bronze: 3,
            medals_silver: 4,
            medals_gold: 5,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "cards": 1, "medals": 2, "medalsBronze": 3, "medalsSilver": 4, "medalsGold": 5 })
        );
    }
}
