use crate::engines::generation::individual::Individual;
use crate::engines::generation::state::SearchState;
use crate::types::{Filter, FilterKey};
use rand::seq::SliceRandom;
use rand::RngCore;

/// Switch one equipment choice of the class to a different alternative.
///
/// Bundles count as a single alternative, nested choices included. The edit
/// is abandoned if the alternative being given up holds a locked item.
pub(super) fn mutate_equipment(state: &SearchState, individual: &Individual, rng: &mut dyn RngCore) -> Option<Filter> {
    let class = state.repo.class(&individual.build.class)?;
    let tree = &class.equipment;
    let node = *tree.choice_nodes().choose(rng)?;
    let alternatives = tree.alternatives(node);
    if alternatives.len() < 2 {
        return None;
    }

    let held = individual.build.equipment_names();
    let current = alternatives
        .iter()
        .position(|alt| tree.alternative_items(alt).iter().any(|item| held.contains(item)));
    let others: Vec<usize> = (0..alternatives.len()).filter(|i| Some(*i) != current).collect();
    let next = *others.choose(rng)?;

    let mut filter = individual.filter.clone();
    if let Some(current) = current {
        let removed = tree.alternative_items(&alternatives[current]);
        if removed
            .iter()
            .any(|item| state.locked.is_locked_item(FilterKey::Equipment, item))
        {
            return None;
        }
        filter.equipment.retain(|item| !removed.contains(&item.as_str()));
    }

    for item in tree.alternative_items(&alternatives[next]) {
        if !filter.equipment.iter().any(|held| held == item) {
            filter.equipment.push(item.to_string());
        }
    }
    Some(filter)
}

#[cfg(test)]
mod tests {
    use super::super::fixture::{realize, state};
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FIGHTER: [&str; 4] = ["Chain Mail", "Longsword", "Light Crossbow", "Explorer's Pack"];

    #[test]
    fn test_equipment_swap_never_gives_up_locked_items() {
        let locked = FIGHTER
            .iter()
            .fold(Filter::default(), |f, item| f.with_item(FilterKey::Equipment, item));
        let state = state(locked);
        let fighter = realize(&state, Filter::default().with_class("Fighter"), 6);
        let mut rng = StdRng::seed_from_u64(6);

        for _ in 0..30 {
            assert_eq!(mutate_equipment(&state, &fighter, &mut rng), None);
        }
    }

    #[test]
    fn test_equipment_swap_trades_one_alternative() {
        let state = state(Filter::default());
        let fighter = realize(&state, Filter::default().with_class("Fighter"), 7);
        let mut rng = StdRng::seed_from_u64(7);

        let filter = (0..30)
            .find_map(|_| mutate_equipment(&state, &fighter, &mut rng))
            .unwrap();
        assert_ne!(filter.equipment, fighter.filter.equipment);
        let child = state
            .realize(&filter, &mut StdRng::seed_from_u64(8))
            .unwrap();
        assert_eq!(child.build.class, "Fighter");
    }
}
