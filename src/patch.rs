//! Patch construction for document augmentation and view filtering
//!
//! Every change made to a stats document is expressed as an ordered list of
//! RFC 6902 `add`/`remove` operations and applied atomically through the
//! `json_patch` engine: if any operation fails (typically a `remove` whose
//! path does not exist) the document is left untouched and the whole patch
//! reports an error.

use crate::derived::DerivedFields;
use crate::document::{GameMode, StatsDocument};
use crate::error::{Result, StatsError};
use crate::models::{ApiVersion, HeroSelection, View};
use crate::registry::HeroRegistry;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Per-mode sections that hold one subtree per hero
pub const HERO_SECTIONS: [&str; 2] = ["topHeroes", "careerStats"];

/// A single patch operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
}

impl PatchOperation {
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. } | PatchOperation::Remove { path } => path,
        }
    }
}

/// Ordered list of operations applied as a unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    ops: Vec<PatchOperation>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, value: Value) -> &mut Self {
        self.ops.push(PatchOperation::Add {
            path: path.into(),
            value,
        });
        self
    }

    pub fn remove(&mut self, path: impl Into<String>) -> &mut Self {
        self.ops.push(PatchOperation::Remove { path: path.into() });
        self
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the patch to a document in place
    ///
    /// # Returns
    /// * `Ok(())` if every operation applied
    /// * `Err(StatsError::Patch)` otherwise, with `doc` unchanged
    pub fn apply(&self, doc: &mut Value) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }

        let encoded = serde_json::to_value(&self.ops)?;
        let patch: json_patch::Patch = serde_json::from_value(encoded)
            .map_err(|e| StatsError::Patch(format!("invalid patch: {}", e)))?;

        json_patch::patch(doc, &patch.0).map_err(|e| {
            debug!("Patch of {} operations failed: {}", self.ops.len(), e);
            StatsError::Patch(e.to_string())
        })
    }
}

/// Build a JSON pointer from raw path segments, escaping `~` and `/`
pub fn pointer<S: AsRef<str>>(segments: &[S]) -> String {
    segments.iter().fold(String::new(), |mut out, segment| {
        out.push('/');
        out.push_str(&segment.as_ref().replace('~', "~0").replace('/', "~1"));
        out
    })
}

/// Patch adding the derived fields and reshaping ratings for `version`
///
/// - every version: `games` and `awards` for each mode with `allHeroes` totals
/// - v2 and later: top-level `rating` and `ratingIcon`
/// - v3 and later: `ratings` replaced by a role-keyed mapping whose entries no
///   longer carry their own `role`
pub fn augmentation(doc: &StatsDocument, derived: &DerivedFields, version: ApiVersion) -> Result<Patch> {
    let mut patch = Patch::new();

    for mode in GameMode::ALL {
        if let Some(totals) = derived.mode(mode) {
            patch
                .add(pointer(&[mode.key(), "games"]), serde_json::to_value(totals.games)?)
                .add(pointer(&[mode.key(), "awards"]), serde_json::to_value(totals.awards)?);
        }
    }

    if version.includes_rating() {
        patch
            .add("/rating", Value::from(derived.rating.rating))
            .add("/ratingIcon", Value::from(derived.rating.icon.clone()));
    }

    if version.keyed_ratings() {
        keyed_ratings(doc, &mut patch);
    }

    Ok(patch)
}

fn keyed_ratings(doc: &StatsDocument, patch: &mut Patch) {
    let mut by_role = Map::new();
    for entry in doc.rating_entries() {
        if let Some(role) = entry.get("role").and_then(Value::as_str) {
            by_role.insert(role.to_string(), entry.clone());
        }
    }

    let roles: Vec<String> = by_role.keys().cloned().collect();

    if doc.has_ratings_member() {
        patch.remove("/ratings");
    }
    patch.add("/ratings", Value::Object(by_role));

    for role in roles {
        patch.remove(pointer(&["ratings", role.as_str(), "role"]));
    }
}

/// Patch reducing a document to its profile summary
pub fn profile() -> Patch {
    let mut patch = Patch::new();
    for section in HERO_SECTIONS {
        for mode in GameMode::ALL {
            patch.remove(pointer(&[mode.key(), section]));
        }
    }
    patch
}

/// Patch removing every registered hero that was not selected
///
/// Selected names the registry does not know are ignored. With an empty
/// registry the patch is empty.
pub fn hero_filter(registry: &HeroRegistry, selection: &HeroSelection) -> Patch {
    let mut patch = Patch::new();
    for hero in registry.iter().filter(|hero| !selection.contains(hero)) {
        for mode in GameMode::ALL {
            for section in HERO_SECTIONS {
                patch.remove(pointer(&[mode.key(), section, hero]));
            }
        }
    }
    patch
}

/// Filter patch for a view; `Complete` needs none
pub fn view_filter(view: &View, registry: &HeroRegistry) -> Option<Patch> {
    match view {
        View::Complete => None,
        View::Profile => Some(profile()),
        View::Heroes(selection) => Some(hero_filter(registry, selection)),
    }
}
