use super::archetype::{round2, ObjectiveWeights};
use crate::content::{cantrip_dice_multiplier, ContentRepository};
use crate::engines::materialize::Build;
use crate::error::{ForgeError, Result};
use crate::types::Ability;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Base worth of each generic tag occurrence, before item power
const GENERIC_TAG_BASE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagFitness {
    pub tag: String,
    pub weight: f64,
    pub fitness: f64,
}

/// Scores of a build against the active archetypes.
///
/// Equality is structural over every pair and tag, which is what duplicate
/// elimination compares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fitness {
    /// (weight, value)
    pub health: (f64, f64),
    /// (weight, value)
    pub magic: (f64, f64),
    pub tags: Vec<TagFitness>,
    pub generic_tags: BTreeMap<String, f64>,
}

impl Fitness {
    /// `[health, magic, tag...]`, padded with zeros up to `count`
    pub fn objectives(&self, count: usize) -> Vec<f64> {
        let mut values: Vec<f64> = [self.health.1, self.magic.1]
            .into_iter()
            .chain(self.tags.iter().map(|t| t.fitness))
            .collect();
        if values.len() < count {
            values.resize(count, 0.0);
        }
        values
    }

    /// Objectives negated for a minimising sort
    pub fn minimization_vector(&self, count: usize) -> Vec<f64> {
        self.objectives(count).into_iter().map(|v| -v).collect()
    }

    pub fn total(&self) -> f64 {
        self.tags.iter().map(|t| t.fitness).sum()
    }
}

/// An item of the build that can carry generic tags
struct TaggedItem<'c> {
    tags: &'c [String],
    power: f64,
}

pub struct FitnessEvaluator<'a> {
    repo: &'a dyn ContentRepository,
    weights: &'a ObjectiveWeights,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(repo: &'a dyn ContentRepository, weights: &'a ObjectiveWeights) -> Self {
        Self { repo, weights }
    }

    pub fn evaluate(&self, build: &Build) -> Result<Fitness> {
        let health = (build.hit_die - 6) as f64 / 2.0 + build.modifier(Ability::Constitution) as f64;
        let magic = magic_value(build);
        let generic_tags = self.generic_tag_scores(build)?;

        let mut tags = Vec::with_capacity(self.weights.tags.len());
        for (tag, weight) in &self.weights.tags {
            let mut fitness = 0.0;
            if let Some(ability) = self.repo.tag_ability(tag) {
                let score = build.score(ability);
                fitness = round2(fitness + Ability::modifier(score) as f64 * weight);
            }

            let proficiency: i32 = self
                .repo
                .tag_proficiencies(tag)
                .iter()
                .filter(|p| build.proficiencies.contains(p))
                .map(|p| build.proficiency_value(p))
                .sum();
            let generic: f64 = self
                .repo
                .tag_generic_tags(tag)
                .iter()
                .filter_map(|g| generic_tags.get(g))
                .sum();
            fitness = round2(fitness + (proficiency as f64 + generic) * weight);

            tags.push(TagFitness {
                tag: tag.clone(),
                weight: *weight,
                fitness,
            });
        }

        Ok(Fitness {
            health: (self.weights.health, health),
            magic: (self.weights.magic, magic),
            tags,
            generic_tags,
        })
    }

    /// Weighted occurrences of every generic tag linked to the archetype tags
    fn generic_tag_scores(&self, build: &Build) -> Result<BTreeMap<String, f64>> {
        let mut scores: BTreeMap<String, f64> = self
            .weights
            .tags
            .iter()
            .flat_map(|(tag, _)| self.repo.tag_generic_tags(tag).iter())
            .map(|g| (g.clone(), 0.0))
            .collect();

        let mut items: Vec<TaggedItem<'_>> = Vec::new();
        for name in build.equipment_names() {
            let def = self
                .repo
                .equipment(name)
                .ok_or_else(|| ForgeError::not_found("Equipment", name))?;
            items.push(TaggedItem {
                tags: &def.generic_tags,
                power: def.power(),
            });
        }
        for name in build.known_spells().chain(build.prepared_spell_options()) {
            let def = self
                .repo
                .spell(name)
                .ok_or_else(|| ForgeError::not_found("Spell", name))?;
            let power = match def.damage {
                Some(dice) if def.is_cantrip() => dice.scaled(cantrip_dice_multiplier(build.level)).power(),
                Some(dice) => dice.power(),
                None => 0.0,
            };
            items.push(TaggedItem {
                tags: &def.generic_tags,
                power,
            });
        }
        for name in &build.traits {
            let def = self
                .repo
                .trait_def(name)
                .ok_or_else(|| ForgeError::not_found("Trait", name))?;
            items.push(TaggedItem {
                tags: &def.generic_tags,
                power: 0.0,
            });
        }

        for item in items {
            let distinct: HashSet<&String> = item.tags.iter().collect();
            for tag in distinct {
                if let Some(score) = scores.get_mut(tag) {
                    let occurrences = item.tags.iter().filter(|t| *t == tag).count() as f64;
                    *score += occurrences * (GENERIC_TAG_BASE + item.power);
                }
            }
        }

        Ok(scores)
    }
}

/// Slot levels times slot counts, plus prepared flexibility, plus spells always known
fn magic_value(build: &Build) -> f64 {
    let mut value = 0.0;
    for casting in &build.spellcasting {
        for (idx, &count) in casting.spell_slots.iter().enumerate() {
            value += ((idx + 1) as u32 * count) as f64;
        }
        if casting.prepared_budget != 0 {
            value += casting.prepared_options.len() as f64 / casting.prepared_budget as f64;
        }
        value += casting.known.len() as f64;
    }
    value
}
