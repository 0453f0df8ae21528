use crate::content::ContentRepository;
use crate::error::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Multipliers applied to the primary and secondary archetype
pub const ARCHETYPE_MULTIPLIERS: [f64; 2] = [2.0, 1.0];

/// The archetypes a search optimises for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchetypeSelection {
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
}

impl ArchetypeSelection {
    pub fn single(name: &str) -> Self {
        Self {
            primary: name.to_string(),
            secondary: None,
        }
    }

    pub fn pair(primary: &str, secondary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: Some(secondary.to_string()),
        }
    }

    /// Primary then secondary; a lone archetype fills both slots
    pub fn slots(&self) -> [&str; 2] {
        [
            self.primary.as_str(),
            self.secondary.as_deref().unwrap_or(&self.primary),
        ]
    }
}

impl Default for ArchetypeSelection {
    fn default() -> Self {
        Self::single("Tank")
    }
}

/// Combined weighting of health, magic and every tag the archetypes care about
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveWeights {
    pub health: f64,
    pub magic: f64,
    /// Sorted by tag name
    pub tags: Vec<(String, f64)>,
}

impl ObjectiveWeights {
    pub fn from_selection(repo: &dyn ContentRepository, selection: &ArchetypeSelection) -> Result<Self> {
        let mut health = 0.0;
        let mut magic = 0.0;
        let mut tags: BTreeMap<String, f64> = BTreeMap::new();

        for (name, multiplier) in selection.slots().into_iter().zip(ARCHETYPE_MULTIPLIERS) {
            let archetype = repo
                .archetype(name)
                .ok_or_else(|| ForgeError::not_found("Archetype", name))?;
            health += archetype.health_weight * multiplier;
            magic += archetype.magic_weight * multiplier;
            for (tag, weight) in &archetype.tags {
                *tags.entry(tag.clone()).or_insert(0.0) += weight * multiplier;
            }
        }

        Ok(Self {
            health: round2(health),
            magic: round2(magic),
            tags: tags.into_iter().collect(),
        })
    }

    /// Health, magic, then one objective per tag
    pub fn objective_count(&self) -> usize {
        2 + self.tags.len()
    }

    pub fn objective_names(&self) -> Vec<String> {
        ["health".to_string(), "magic".to_string()]
            .into_iter()
            .chain(self.tags.iter().map(|(tag, _)| tag.clone()))
            .collect()
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
