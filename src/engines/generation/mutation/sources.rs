use crate::content::OptionPool;
use crate::engines::generation::individual::Individual;
use crate::engines::generation::operators::{chance, GRANT_LISTS};
use crate::engines::generation::state::SearchState;
use crate::types::{ChoiceCategory, Filter, FilterKey, SourceKind};
use rand::seq::SliceRandom;
use rand::RngCore;

/// Where a group of grants can come from
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scope<'a> {
    /// A source together with all of its variants
    Whole(SourceKind, &'a str),
    /// Only what the id declares itself
    Declared(SourceKind, &'a str),
}

impl Scope<'_> {
    fn pool(&self, state: &SearchState, category: ChoiceCategory) -> OptionPool {
        match *self {
            Scope::Whole(kind, id) => state
                .repo
                .option_pool(category, kind, id, state.level())
                .unwrap_or_default(),
            Scope::Declared(kind, id) => state.repo.declared_pool(category, kind, id, state.level()),
        }
    }
}

/// Hand the grants of `old` over to `new`.
///
/// Items nothing but `old` could have supplied survive only if `new` offers
/// them too, as long as the choice points of `new` can still hand out every
/// kept item. Locked items are never dropped.
pub(crate) fn reassign_grants(
    state: &SearchState,
    filter: &mut Filter,
    old: Scope<'_>,
    new: Scope<'_>,
    others: &[Scope<'_>],
) {
    for (category, keys) in GRANT_LISTS {
        let old_pool = old.pool(state, category);
        if old_pool.options.is_empty() {
            continue;
        }
        let new_pool = new.pool(state, category);
        let other_pools: Vec<OptionPool> = others.iter().map(|scope| scope.pool(state, category)).collect();

        let mut kept: Vec<String> = Vec::new();
        for &key in keys {
            let Some(list) = filter.list_mut(key) else {
                continue;
            };
            list.retain(|item| {
                if state.locked.is_locked_item(key, item)
                    || !old_pool.offers(item)
                    || other_pools.iter().any(|pool| pool.offers(item))
                {
                    return true;
                }
                if !new_pool.offers(item) {
                    return false;
                }
                let mut held: Vec<&str> = kept.iter().map(String::as_str).collect();
                held.push(item.as_str());
                if new_pool.fits(&held) {
                    kept.push(item.clone());
                    return true;
                }
                false
            });
        }
    }
}

fn pick_other<'a>(options: &'a [String], current: Option<&str>, rng: &mut dyn RngCore) -> Option<&'a String> {
    let choices: Vec<&String> = options
        .iter()
        .filter(|option| Some(option.as_str()) != current)
        .collect();
    choices.choose(rng).copied()
}

/// Racial bonuses and class priorities change with the source, so the old
/// final scores no longer say anything. Only locked ranges stay.
fn release_abilities(state: &SearchState, filter: &mut Filter) {
    filter
        .abilities
        .retain(|&ability, _| state.locked.locks(FilterKey::Ability(ability)));
}

pub(crate) fn race_is_free(state: &SearchState) -> bool {
    !state.locked.locks(FilterKey::Race) && !state.locked.locks(FilterKey::Subrace)
}

pub(crate) fn class_is_free(state: &SearchState) -> bool {
    !state.locked.locks(FilterKey::Class) && !state.locked.locks(FilterKey::Subclass)
}

pub(crate) fn swap_race_to(state: &SearchState, individual: &Individual, filter: &mut Filter, next: &str) {
    let build = &individual.build;
    reassign_grants(
        state,
        filter,
        Scope::Whole(SourceKind::Race, &build.race),
        Scope::Whole(SourceKind::Race, next),
        &[
            Scope::Whole(SourceKind::Class, &build.class),
            Scope::Whole(SourceKind::Background, &build.background),
        ],
    );
    filter.race = Some(next.to_string());
    filter.subrace = None;
    release_abilities(state, filter);
}

pub(crate) fn swap_class_to(state: &SearchState, individual: &Individual, filter: &mut Filter, next: &str) {
    let build = &individual.build;
    reassign_grants(
        state,
        filter,
        Scope::Whole(SourceKind::Class, &build.class),
        Scope::Whole(SourceKind::Class, next),
        &[
            Scope::Whole(SourceKind::Race, &build.race),
            Scope::Whole(SourceKind::Background, &build.background),
        ],
    );
    filter.class = Some(next.to_string());
    filter.subclass = None;
    release_abilities(state, filter);
}

pub(crate) fn swap_background_to(state: &SearchState, individual: &Individual, filter: &mut Filter, next: &str) {
    let build = &individual.build;
    reassign_grants(
        state,
        filter,
        Scope::Whole(SourceKind::Background, &build.background),
        Scope::Whole(SourceKind::Background, next),
        &[
            Scope::Whole(SourceKind::Race, &build.race),
            Scope::Whole(SourceKind::Class, &build.class),
        ],
    );
    filter.background = Some(next.to_string());
}

pub(super) fn mutate_race(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    let build = &individual.build;
    let race = state.repo.race(&build.race)?;
    let mut filter = individual.filter.clone();

    if !state.locked.locks(FilterKey::Subrace)
        && race.subraces.len() > 1
        && chance(state.config.sub_locus_probability, rng)
    {
        let names: Vec<String> = race.subraces.iter().map(|s| s.name.clone()).collect();
        let next = pick_other(&names, build.subrace.as_deref(), rng)?;
        if let Some(old) = &build.subrace {
            reassign_grants(
                state,
                &mut filter,
                Scope::Declared(SourceKind::Race, old),
                Scope::Declared(SourceKind::Race, next),
                &[
                    Scope::Declared(SourceKind::Race, &build.race),
                    Scope::Whole(SourceKind::Class, &build.class),
                    Scope::Whole(SourceKind::Background, &build.background),
                ],
            );
        }
        filter.subrace = Some(next.clone());
        release_abilities(state, &mut filter);
        return Some(filter);
    }

    if !race_is_free(state) {
        return None;
    }
    let races = state.repo.source_ids(SourceKind::Race);
    let next = pick_other(&races, Some(build.race.as_str()), rng)?;
    swap_race_to(state, individual, &mut filter, next);
    Some(filter)
}

pub(super) fn mutate_class(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    let build = &individual.build;
    let class = state.repo.class(&build.class)?;
    let mut filter = individual.filter.clone();

    let subclasses: Vec<String> = class
        .subclasses
        .iter()
        .filter(|s| s.required_level <= state.level())
        .map(|s| s.name.clone())
        .collect();
    if !state.locked.locks(FilterKey::Subclass)
        && subclasses.len() > 1
        && chance(state.config.sub_locus_probability, rng)
    {
        let next = pick_other(&subclasses, build.subclass.as_deref(), rng)?;
        if let Some(old) = &build.subclass {
            reassign_grants(
                state,
                &mut filter,
                Scope::Declared(SourceKind::Class, old),
                Scope::Declared(SourceKind::Class, next),
                &[
                    Scope::Declared(SourceKind::Class, &build.class),
                    Scope::Whole(SourceKind::Race, &build.race),
                    Scope::Whole(SourceKind::Background, &build.background),
                ],
            );
        }
        filter.subclass = Some(next.clone());
        return Some(filter);
    }

    if !class_is_free(state) {
        return None;
    }
    let classes = state.repo.source_ids(SourceKind::Class);
    let next = pick_other(&classes, Some(build.class.as_str()), rng)?;
    swap_class_to(state, individual, &mut filter, next);
    Some(filter)
}

pub(super) fn mutate_background(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    if state.locked.locks(FilterKey::Background) {
        return None;
    }
    let backgrounds = state.repo.source_ids(SourceKind::Background);
    let next = pick_other(&backgrounds, Some(individual.build.background.as_str()), rng)?;
    let mut filter = individual.filter.clone();
    swap_background_to(state, individual, &mut filter, next);
    Some(filter)
}

#[cfg(test)]
mod tests {
    use super::super::fixture::{realize, state};
    use super::*;
    use crate::types::{Ability, AbilityRange};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_race_swap_keeps_what_the_new_race_offers() {
        let state = state(Filter::default());
        let half_elf = realize(
            &state,
            Filter::default()
                .with_race("Half-Elf")
                .with_class("Rogue")
                .with_background("Criminal"),
            12,
        );
        let mut filter = half_elf.filter.clone();
        swap_race_to(&state, &half_elf, &mut filter, "Human");

        assert_eq!(filter.race.as_deref(), Some("Human"));
        assert!(filter.languages.iter().any(|l| l == "Common"));
        assert!(filter.languages.iter().all(|l| half_elf.filter.languages.contains(l)));
        // Human hands out Common plus a single pick
        assert_eq!(filter.languages.len(), 2);
        // Rogue offers every Half-Elf skill, so none are lost
        assert_eq!(filter.skills, half_elf.filter.skills);
    }

    #[test]
    fn test_class_swap_releases_unlocked_ability_ranges() {
        let dexterous = AbilityRange::new(12, 17);
        let state = state(Filter::default().with_ability(Ability::Dexterity, dexterous));
        let rogue = realize(&state, Filter::default().with_race("Human").with_class("Rogue"), 13);
        assert_eq!(rogue.filter.abilities.len(), Ability::ALL.len());

        let mut filter = rogue.filter.clone();
        swap_class_to(&state, &rogue, &mut filter, "Wizard");
        assert_eq!(filter.abilities.keys().copied().collect::<Vec<_>>(), vec![Ability::Dexterity]);

        let wizard = state
            .realize(&state.locked.apply(&filter), &mut StdRng::seed_from_u64(13))
            .unwrap();
        assert_eq!(wizard.build.class, "Wizard");
        assert!(wizard.build.ability_scores[&Ability::Intelligence] >= 15);
    }

    #[test]
    fn test_subclass_edit_needs_more_than_one_subclass() {
        let state = state(Filter::default().with_race("Human"));
        let fighter = realize(&state, Filter::default().with_class("Fighter"), 14);
        let mut rng = StdRng::seed_from_u64(14);

        let filter = mutate_class(&state, &fighter, &mut rng).unwrap();
        assert_ne!(filter.class, fighter.filter.class);
        assert_eq!(filter.subclass, None);
    }
}
