//! Local edits of a single genotype.
//!
//! A locus is drawn from the configured weights and its edit proposes a new
//! Filter. Proposals that touch a locked value, or that no longer build, are
//! thrown away and another locus is drawn, up to `mutation_retries` times.

pub mod basic;
pub mod equipment;
pub mod sources;
pub mod spells;

use super::individual::Individual;
use super::operators::OperatorReport;
use super::state::SearchState;
use crate::types::Filter;
use rand::distributions::Distribution;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

type Edit = fn(&SearchState, &Individual, &mut dyn RngCore) -> Option<Filter>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationLocus {
    /// Race, or subrace with `sub_locus_probability`
    Race,
    /// Class, or subclass with `sub_locus_probability`
    Class,
    Background,
    Languages,
    Proficiencies,
    Spells,
    Equipment,
    Skills,
}

impl MutationLocus {
    /// Same order as `LocusWeights::values`
    pub const ALL: [MutationLocus; 8] = [
        MutationLocus::Race,
        MutationLocus::Class,
        MutationLocus::Background,
        MutationLocus::Languages,
        MutationLocus::Proficiencies,
        MutationLocus::Spells,
        MutationLocus::Equipment,
        MutationLocus::Skills,
    ];

    fn edit(self) -> Edit {
        match self {
            MutationLocus::Race => sources::mutate_race,
            MutationLocus::Class => sources::mutate_class,
            MutationLocus::Background => sources::mutate_background,
            MutationLocus::Languages => basic::mutate_languages,
            MutationLocus::Proficiencies => basic::mutate_proficiencies,
            MutationLocus::Spells => spells::mutate_spells,
            MutationLocus::Equipment => equipment::mutate_equipment,
            MutationLocus::Skills => basic::mutate_skills,
        }
    }

    /// Proposed genotype, or `None` when the edit does not apply to this individual
    pub fn propose<R: Rng>(self, state: &SearchState, individual: &Individual, rng: &mut R) -> Option<Filter> {
        (self.edit())(state, individual, rng)
    }
}

/// Mutate `individual`, returning it unchanged when every attempt fails
pub fn mutate<R: Rng>(
    state: &SearchState,
    individual: &Individual,
    rng: &mut R,
    report: &mut OperatorReport,
) -> Individual {
    let retries = state.config.mutation_retries;

    for _ in 0..retries {
        let locus = MutationLocus::ALL[state.locus_distribution().sample(rng)];
        let Some(genotype) = locus.propose(state, individual, rng) else {
            continue;
        };
        if let Some(key) = state.locked.violation(&genotype) {
            log::debug!("{:?} edit rejected, it touches locked key {}", locus, key);
            continue;
        }
        match state.realize(&genotype, rng) {
            Ok(mutant) => return mutant,
            Err(error) => report.discard(&error),
        }
    }

    report.mutation_exhaustions += 1;
    log::warn!(
        "Mutation of a {} {} gave up after {} attempts; keeping it unchanged",
        individual.build.race,
        individual.build.class,
        retries
    );
    individual.clone()
}

#[cfg(test)]
pub(super) mod fixture {
    use crate::config::SearchConfig;
    use crate::content::Catalogue;
    use crate::engines::fitness::ArchetypeSelection;
    use crate::engines::generation::individual::Individual;
    use crate::engines::generation::state::SearchState;
    use crate::types::Filter;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    pub fn state_with(config: SearchConfig, locked: Filter) -> SearchState {
        let catalogue = Catalogue::from_json(include_str!("../../../../tests/fixtures/catalogue.json")).unwrap();
        SearchState::new(
            Arc::new(catalogue),
            config,
            &ArchetypeSelection::pair("Tank", "Blaster"),
            locked,
        )
        .unwrap()
    }

    pub fn state(locked: Filter) -> SearchState {
        state_with(SearchConfig::default(), locked)
    }

    /// Build `filter` under the state's locks
    pub fn realize(state: &SearchState, filter: Filter, seed: u64) -> Individual {
        state
            .realize(&state.locked.apply(&filter), &mut StdRng::seed_from_u64(seed))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::{realize, state_with};
    use super::*;
    use crate::config::{LocusWeights, SearchConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fully_locked_sources_exhaust_mutation() {
        let config = SearchConfig {
            mutation_retries: 6,
            locus_weights: LocusWeights {
                race: 1.0,
                class: 1.0,
                background: 1.0,
                languages: 0.0,
                proficiencies: 0.0,
                spells: 0.0,
                equipment: 0.0,
                skills: 0.0,
            },
            ..SearchConfig::default()
        };
        let locked = Filter::default()
            .with_race("Human")
            .with_class("Fighter")
            .with_background("Soldier");
        let state = state_with(config, locked);
        let fighter = realize(&state, Filter::default(), 1);

        let mut report = OperatorReport::default();
        let mut rng = StdRng::seed_from_u64(1);
        let kept = mutate(&state, &fighter, &mut rng, &mut report);

        assert_eq!(kept.filter, fighter.filter);
        assert_eq!(kept.objectives, fighter.objectives);
        assert_eq!(report.mutation_exhaustions, 1);
        assert_eq!(report.discarded_total(), 0);
    }
}
