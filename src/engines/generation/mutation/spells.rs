use super::sources::{class_is_free, race_is_free, swap_class_to, swap_race_to};
use crate::engines::generation::individual::Individual;
use crate::engines::generation::state::SearchState;
use crate::engines::materialize::Spellcasting;
use crate::types::{ChoiceCategory, Filter, FilterKey, SourceKind};
use rand::seq::SliceRandom;
use rand::RngCore;

pub(super) fn mutate_spells(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    match individual
        .build
        .spellcasting
        .iter()
        .find(|casting| casting.source == SourceKind::Class)
    {
        Some(casting) => swap_spell(state, individual, casting, rng),
        None => gain_spellcasting(state, individual, rng),
    }
}

/// Replace one class spell with an unheld spell of the same level
fn swap_spell(
    state: &SearchState,
    individual: &Individual,
    casting: &Spellcasting,
    rng: &mut dyn RngCore,
) -> Option<Filter> {
    let build = &individual.build;
    let level = state.level();
    let racial = state
        .repo
        .option_pool(ChoiceCategory::Spell, SourceKind::Race, &build.race, level)?;

    let swappable: Vec<&String> = casting
        .known
        .iter()
        .chain(&casting.prepared)
        .filter(|spell| !racial.offers(spell) && !state.locked.is_locked_item(FilterKey::Spells, spell))
        .collect();
    let old = *swappable.choose(rng)?;
    let old_level = state.repo.spell(old)?.level;

    let pool = state
        .repo
        .option_pool(ChoiceCategory::Spell, SourceKind::Class, &build.class, level)?;
    let held = build.spell_names();
    let replacements: Vec<&String> = pool
        .options
        .iter()
        .filter(|spell| !held.contains(&spell.as_str()))
        .filter(|spell| state.repo.spell(spell).map_or(false, |def| def.level == old_level))
        .collect();
    let new = *replacements.choose(rng)?;

    let mut filter = individual.filter.clone();
    for spell in filter.spells.iter_mut().filter(|spell| *spell == old) {
        *spell = new.clone();
    }
    Some(filter)
}

/// Only racial spells (or none): move to a race or class that casts
fn gain_spellcasting(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    let build = &individual.build;
    let level = state.level();
    let casts = |kind: SourceKind, id: &str| {
        state
            .repo
            .option_pool(ChoiceCategory::Spell, kind, id, level)
            .map_or(false, |pool| pool.capacity > 0)
    };

    let mut targets: Vec<(SourceKind, String)> = Vec::new();
    if race_is_free(state) {
        targets.extend(
            state
                .repo
                .source_ids(SourceKind::Race)
                .into_iter()
                .filter(|race| *race != build.race && casts(SourceKind::Race, race))
                .map(|race| (SourceKind::Race, race)),
        );
    }
    if class_is_free(state) {
        targets.extend(
            state
                .repo
                .source_ids(SourceKind::Class)
                .into_iter()
                .filter(|class| *class != build.class && casts(SourceKind::Class, class))
                .map(|class| (SourceKind::Class, class)),
        );
    }

    let (kind, target) = targets.choose(rng)?;
    let mut filter = individual.filter.clone();
    match kind {
        SourceKind::Race => swap_race_to(state, individual, &mut filter, target),
        _ => swap_class_to(state, individual, &mut filter, target),
    }
    Some(filter)
}
