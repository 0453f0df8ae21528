use super::individual::Individual;
use crate::config::SearchConfig;
use crate::config::traits::ConfigSection;
use crate::content::ContentRepository;
use crate::engines::fitness::{ArchetypeSelection, FitnessEvaluator, ObjectiveWeights};
use crate::engines::materialize::{Build, Materializer};
use crate::error::{ForgeError, Result};
use crate::types::{Filter, FilterKey};
use rand::distributions::WeightedIndex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// User-pinned constraints every produced individual must honour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockedFilters(Filter);

impl LockedFilters {
    pub fn new(filter: Filter) -> Self {
        Self(filter)
    }

    pub fn filter(&self) -> &Filter {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn locks(&self, key: FilterKey) -> bool {
        match key {
            FilterKey::Ability(ability) => self.0.abilities.contains_key(&ability),
            _ => self.0.scalar(key).is_some() || !self.0.list(key).is_empty(),
        }
    }

    pub fn is_locked_item(&self, key: FilterKey, item: &str) -> bool {
        self.0.list(key).iter().any(|locked| locked == item)
    }

    /// Merge the locks into `filter`: scalars overwrite, lists union, ranges intersect
    pub fn apply(&self, filter: &Filter) -> Filter {
        let mut merged = filter.clone();

        for key in FilterKey::SCALARS {
            if let (Some(value), Some(slot)) = (self.0.scalar(key), merged.scalar_mut(key)) {
                *slot = Some(value.clone());
            }
        }

        for key in FilterKey::LISTS {
            if let Some(list) = merged.list_mut(key) {
                for item in self.0.list(key) {
                    if !list.contains(item) {
                        list.push(item.clone());
                    }
                }
            }
        }

        for (ability, locked) in &self.0.abilities {
            let range = merged
                .abilities
                .get(ability)
                .map(|current| current.intersect(locked))
                .unwrap_or(*locked);
            merged.abilities.insert(*ability, range);
        }

        merged
    }

    /// First locked key the realized filter does not honour
    pub fn violation(&self, realized: &Filter) -> Option<FilterKey> {
        for key in FilterKey::SCALARS {
            if let Some(value) = self.0.scalar(key) {
                if realized.scalar(key) != Some(value) {
                    return Some(key);
                }
            }
        }

        for key in FilterKey::LISTS {
            let held = realized.list(key);
            if self.0.list(key).iter().any(|item| !held.contains(item)) {
                return Some(key);
            }
        }

        for (ability, locked) in &self.0.abilities {
            let honoured = realized
                .abilities
                .get(ability)
                .map(|range| locked.contains(range.min))
                .unwrap_or(false);
            if !honoured {
                return Some(FilterKey::Ability(*ability));
            }
        }

        None
    }

    pub fn check(&self, realized: &Filter) -> Result<()> {
        match self.violation(realized) {
            Some(key) => Err(ForgeError::LockedFilterViolation {
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Everything the operators share during a run
pub struct SearchState {
    pub repo: Arc<dyn ContentRepository>,
    pub locked: LockedFilters,
    pub weights: ObjectiveWeights,
    pub config: SearchConfig,
    locus_distribution: WeightedIndex<f64>,
}

impl SearchState {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        config: SearchConfig,
        archetypes: &ArchetypeSelection,
        locked: Filter,
    ) -> Result<Self> {
        config.validate()?;
        let weights = ObjectiveWeights::from_selection(repo.as_ref(), archetypes)?;
        let locus_distribution = WeightedIndex::new(config.locus_weights.values())
            .map_err(|e| ForgeError::Configuration(format!("Invalid locus weights: {}", e)))?;

        Ok(Self {
            repo,
            locked: LockedFilters::new(locked),
            weights,
            config,
            locus_distribution,
        })
    }

    pub fn objective_count(&self) -> usize {
        self.weights.objective_count()
    }

    pub fn level(&self) -> u32 {
        self.config.character_level
    }

    pub fn materializer(&self) -> Materializer<'_> {
        Materializer::new(self.repo.as_ref(), self.config.character_level)
    }

    pub fn evaluator(&self) -> FitnessEvaluator<'_> {
        FitnessEvaluator::new(self.repo.as_ref(), &self.weights)
    }

    pub(crate) fn locus_distribution(&self) -> &WeightedIndex<f64> {
        &self.locus_distribution
    }

    /// Build and score `filter`, rejecting results that break a lock
    pub fn realize<R: Rng>(&self, filter: &Filter, rng: &mut R) -> Result<Individual> {
        let build = self.materializer().build(filter, rng)?;
        self.score(build)
    }

    pub fn score(&self, build: Build) -> Result<Individual> {
        self.locked.check(&build.to_filter())?;
        let fitness = self.evaluator().evaluate(&build)?;
        Ok(Individual::new(build, fitness, self.objective_count()))
    }
}
