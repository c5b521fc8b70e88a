//! Process-wide registry of known hero identifiers
//!
//! Populated once at startup from a representative player's document and
//! read-only afterwards, so it can be shared behind an `Arc` without locking.
//! An empty registry is a valid, degraded state: hero-subset requests then
//! have nothing to filter.

use crate::document::{GameMode, StatsDocument, ALL_HEROES};
use crate::models::{Platform, PlayerTag};
use crate::source::StatsSource;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeroRegistry {
    heroes: BTreeSet<String>,
}

impl HeroRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I, S>(heroes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HeroRegistry {
            heroes: heroes.into_iter().map(Into::into).collect(),
        }
    }

    /// Collect hero identifiers from a document's quick play section
    ///
    /// The union of `topHeroes` and `careerStats` keys is taken. The
    /// `allHeroes` career entry holds totals rather than a hero and is left
    /// out.
    pub fn from_document(doc: &StatsDocument) -> Self {
        let Some(quick_play) = doc.tree().get(GameMode::QuickPlay.key()) else {
            return Self::empty();
        };

        let heroes = ["topHeroes", "careerStats"]
            .iter()
            .filter_map(|section| quick_play.get(section))
            .filter_map(|section| section.as_object())
            .flat_map(|section| section.keys())
            .filter(|hero| hero.as_str() != ALL_HEROES)
            .cloned()
            .collect();

        HeroRegistry { heroes }
    }

    /// Populate the registry by fetching a representative player
    ///
    /// Fetch failures are logged and produce an empty registry; they never
    /// abort startup.
    pub async fn load(source: &dyn StatsSource, platform: Platform, tag: &PlayerTag) -> Self {
        match source.fetch(platform, tag).await {
            Ok(doc) => {
                let registry = Self::from_document(&doc);
                info!(
                    "Hero registry populated from {}/{}: {} heroes",
                    platform,
                    tag,
                    registry.len()
                );
                registry
            }
            Err(e) => {
                warn!(
                    "Failed to populate hero registry from {}/{}: {}; hero filtering disabled",
                    platform, tag, e
                );
                Self::empty()
            }
        }
    }

    pub fn contains(&self, hero: &str) -> bool {
        self.heroes.contains(hero)
    }

    /// Heroes in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.heroes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }
}
