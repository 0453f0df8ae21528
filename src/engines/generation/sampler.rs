use super::individual::Individual;
use super::state::SearchState;
use crate::engines::resolution::requirements_from_filter;
use crate::error::{ForgeError, Result};
use crate::types::Filter;
use rand::Rng;

/// Random build honouring only the locked filters.
///
/// Locks naming content that does not exist abort straight away. Any other
/// failed draw, including a random source whose content refers to something
/// missing, is retried up to `sampling_attempts` times.
pub fn sample_one<R: Rng>(state: &SearchState, rng: &mut R) -> Result<Individual> {
    let filter = state.locked.apply(&Filter::default());
    if !state.locked.is_empty() {
        requirements_from_filter(state.repo.as_ref(), state.locked.filter(), state.level())
            .map_err(|error| ForgeError::LockedFiltersUnsatisfiable(error.to_string()))?;
    }
    let mut last_error = None;

    for _ in 0..state.config.sampling_attempts {
        match state.realize(&filter, rng) {
            Ok(individual) => return Ok(individual),
            Err(error) if error.is_individual_fault() => {
                log::debug!("Sampling attempt discarded: {}", error);
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    Err(ForgeError::LockedFiltersUnsatisfiable(
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no sampling attempts were made".to_string()),
    ))
}

/// `count` random individuals, drawn sequentially from `rng`
pub fn sample<R: Rng>(state: &SearchState, count: usize, rng: &mut R) -> Result<Vec<Individual>> {
    (0..count).map(|_| sample_one(state, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::content::{Catalogue, CatalogueData};
    use crate::engines::fitness::ArchetypeSelection;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    /// Fixture catalogue whose Wizard starts with an item nobody defined
    fn state_without_spellbook(locked: Filter) -> SearchState {
        let mut data: CatalogueData =
            serde_json::from_str(include_str!("../../../tests/fixtures/catalogue.json")).unwrap();
        data.equipment.retain(|item| item.name != "Spellbook");
        SearchState::new(
            Arc::new(Catalogue::from(data)),
            SearchConfig::default(),
            &ArchetypeSelection::single("Blaster"),
            locked,
        )
        .unwrap()
    }

    #[test]
    fn test_broken_source_is_retried_past() {
        let state = state_without_spellbook(Filter::default());
        let mut rng = StdRng::seed_from_u64(21);
        let population = sample(&state, 12, &mut rng).unwrap();
        assert!(population.iter().all(|i| i.build.class != "Wizard"));
    }

    #[test]
    fn test_locks_on_missing_or_broken_content_are_unsatisfiable() {
        let mut rng = StdRng::seed_from_u64(22);

        let missing = state_without_spellbook(Filter::default().with_race("Orc"));
        assert!(matches!(
            sample_one(&missing, &mut rng),
            Err(ForgeError::LockedFiltersUnsatisfiable(_))
        ));

        let broken = state_without_spellbook(Filter::default().with_class("Wizard"));
        assert!(matches!(
            sample_one(&broken, &mut rng),
            Err(ForgeError::LockedFiltersUnsatisfiable(_))
        ));
    }
}
