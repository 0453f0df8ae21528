use super::individual::Individual;
use super::operators::{OperatorReport, GRANT_LISTS};
use super::state::SearchState;
use crate::types::{AbilityRange, Filter, SourceKind};
use rand::Rng;

/// Which parent supplies each core part of a child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Donors {
    pub race: usize,
    pub class: usize,
    pub background: usize,
}

impl Donors {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            race: rng.gen_range(0..2),
            class: rng.gen_range(0..2),
            background: rng.gen_range(0..2),
        }
    }
}

/// Copy the list items `donor` actually got from its `kind` source. The child
/// takes that source (and its variant) whole, so the same choice points can
/// hand them out again.
fn donate(donor: &Individual, kind: SourceKind, child: &mut Filter) {
    for (category, keys) in GRANT_LISTS {
        let granted = donor.build.granted_by(kind, category);
        if granted.is_empty() {
            continue;
        }
        for &key in keys {
            let offered: Vec<String> = donor
                .filter
                .list(key)
                .iter()
                .filter(|item| granted.contains(&item.as_str()))
                .cloned()
                .collect();
            if let Some(list) = child.list_mut(key) {
                for item in offered {
                    if !list.contains(&item) {
                        list.push(item);
                    }
                }
            }
        }
    }
}

/// Genotype of a child taking race, class and background from the chosen parents.
///
/// The race donor also hands over its exact final ability scores, so the
/// racial bonuses baked into them stay consistent.
pub fn merge_parents(state: &SearchState, parents: [&Individual; 2], donors: Donors) -> Filter {
    let race_parent = parents[donors.race];
    let class_parent = parents[donors.class];
    let background_parent = parents[donors.background];

    let mut child = Filter {
        race: Some(race_parent.build.race.clone()),
        subrace: race_parent.build.subrace.clone(),
        class: Some(class_parent.build.class.clone()),
        subclass: class_parent.build.subclass.clone(),
        background: Some(background_parent.build.background.clone()),
        abilities: race_parent
            .build
            .ability_scores
            .iter()
            .map(|(&ability, &score)| (ability, AbilityRange::exact(score)))
            .collect(),
        ..Filter::default()
    };

    donate(race_parent, SourceKind::Race, &mut child);
    donate(class_parent, SourceKind::Class, &mut child);
    donate(background_parent, SourceKind::Background, &mut child);

    state.locked.apply(&child)
}

/// One child of two parents; after `crossover_retries` failed merges a parent is cloned
pub fn breed<R: Rng>(
    state: &SearchState,
    parents: [&Individual; 2],
    rng: &mut R,
    report: &mut OperatorReport,
) -> Individual {
    for _ in 0..state.config.crossover_retries.max(1) {
        let donors = Donors::random(rng);
        let genotype = merge_parents(state, parents, donors);
        match state.realize(&genotype, rng) {
            Ok(child) => return child,
            Err(error) => report.discard(&error),
        }
    }

    report.crossover_fallbacks += 1;
    parents[rng.gen_range(0..2)].clone()
}

/// Two independently bred children
pub fn crossover<R: Rng>(
    state: &SearchState,
    first: &Individual,
    second: &Individual,
    rng: &mut R,
    report: &mut OperatorReport,
) -> (Individual, Individual) {
    let a = breed(state, [first, second], rng, report);
    let b = breed(state, [first, second], rng, report);
    (a, b)
}
