use super::sources::swap_background_to;
use crate::content::ChoicePoint;
use crate::engines::generation::individual::Individual;
use crate::engines::generation::state::SearchState;
use crate::types::{is_skill, ChoiceCategory, Filter, FilterKey, SourceKind};
use rand::seq::SliceRandom;
use rand::RngCore;

/// Grants edited one instance at a time through the background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    Language,
    Proficiency,
    Skill,
}

impl Grant {
    fn key(self) -> FilterKey {
        match self {
            Grant::Language => FilterKey::Languages,
            Grant::Proficiency => FilterKey::Proficiencies,
            Grant::Skill => FilterKey::Skills,
        }
    }

    fn category(self) -> ChoiceCategory {
        match self {
            Grant::Language => ChoiceCategory::Language,
            Grant::Proficiency | Grant::Skill => ChoiceCategory::Proficiency,
        }
    }

    fn accepts(self, item: &str) -> bool {
        match self {
            Grant::Language => true,
            Grant::Proficiency => !is_skill(item),
            Grant::Skill => is_skill(item),
        }
    }

    fn supplied_by(self, point: &ChoicePoint) -> bool {
        point.category == self.category() && point.options.iter().any(|o| self.accepts(o))
    }
}

pub(super) fn mutate_languages(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    swap_grant(state, individual, Grant::Language, rng)
}

pub(super) fn mutate_proficiencies(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    swap_grant(state, individual, Grant::Proficiency, rng)
}

pub(super) fn mutate_skills(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    swap_grant(state, individual, Grant::Skill, rng)
}

/// Swap one background-chosen instance, or move to a background that offers a choice
fn swap_grant(state: &SearchState, individual: &Individual, grant: Grant, rng: &mut dyn RngCore) -> Option<Filter> {
    let background = state.repo.background(&individual.build.background)?;
    let open: Vec<&ChoicePoint> = background
        .options
        .iter()
        .filter(|point| !point.is_fixed() && grant.supplied_by(point))
        .collect();
    let Some(point) = open.choose(rng) else {
        return switch_background(state, individual, grant, rng);
    };

    let key = grant.key();
    let held = individual.filter.list(key);
    let granted: Vec<&String> = point
        .options
        .iter()
        .filter(|o| grant.accepts(o) && held.contains(o) && !state.locked.is_locked_item(key, o))
        .collect();
    let old = *granted.choose(rng)?;
    let replacements: Vec<&String> = point
        .options
        .iter()
        .filter(|o| grant.accepts(o) && !held.contains(o))
        .collect();
    let new = *replacements.choose(rng)?;

    let mut filter = individual.filter.clone();
    if let Some(list) = filter.list_mut(key) {
        for item in list.iter_mut().filter(|item| *item == old) {
            *item = new.clone();
        }
    }
    Some(filter)
}

fn switch_background(state: &SearchState, individual: &Individual, grant: Grant, rng: &mut dyn RngCore) -> Option<Filter> {
    if state.locked.locks(FilterKey::Background) {
        return None;
    }
    let candidates: Vec<String> = state
        .repo
        .source_ids(SourceKind::Background)
        .into_iter()
        .filter(|id| *id != individual.build.background)
        .filter(|id| {
            state
                .repo
                .background(id)
                .map_or(false, |bg| bg.options.iter().any(|p| grant.supplied_by(p)))
        })
        .collect();
    let next = candidates.choose(rng)?;

    let mut filter = individual.filter.clone();
    swap_background_to(state, individual, &mut filter, next);
    Some(filter)
}

#[cfg(test)]
mod tests {
    use super::super::fixture::{realize, state};
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn acolyte_fighter() -> Filter {
        Filter::default()
            .with_race("Human")
            .with_class("Fighter")
            .with_background("Acolyte")
    }

    #[test]
    fn test_skill_edit_without_open_point_switches_background() {
        let state = state(Filter::default());
        let fighter = realize(&state, acolyte_fighter(), 9);
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..10 {
            let filter = mutate_skills(&state, &fighter, &mut rng).unwrap();
            let next = filter.background.as_deref().unwrap();
            assert_ne!(next, "Acolyte");
            let offers_skill = state
                .repo
                .background(next)
                .unwrap()
                .options
                .iter()
                .any(|point| Grant::Skill.supplied_by(point));
            assert!(offers_skill);
        }
    }

    #[test]
    fn test_locked_background_blocks_the_switch() {
        let state = state(Filter::default().with_background("Acolyte"));
        let fighter = realize(&state, acolyte_fighter(), 10);
        let mut rng = StdRng::seed_from_u64(10);
        assert_eq!(mutate_skills(&state, &fighter, &mut rng), None);
    }

    #[test]
    fn test_language_swap_stays_within_the_open_point() {
        let state = state(Filter::default());
        let fighter = realize(&state, acolyte_fighter(), 11);
        let mut rng = StdRng::seed_from_u64(11);

        let filter = mutate_languages(&state, &fighter, &mut rng).unwrap();
        assert_eq!(filter.background, fighter.filter.background);
        assert_eq!(filter.languages.len(), fighter.filter.languages.len());
        let added: Vec<&String> = filter
            .languages
            .iter()
            .filter(|l| !fighter.filter.languages.contains(l))
            .collect();
        assert_eq!(added.len(), 1);
        assert!(["Celestial", "Dwarvish", "Elvish", "Giant", "Infernal"].contains(&added[0].as_str()));
    }
}
