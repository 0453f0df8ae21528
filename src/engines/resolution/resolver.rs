use super::requirement::{ChoiceRequirement, PoolKey, RequirementSet};
use crate::error::{ForgeError, Result};
use crate::types::{ChoiceCategory, SourceKind};
use std::collections::{BTreeMap, HashMap};

/// An item assigned to a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub category: ChoiceCategory,
    pub item: String,
}

/// The option chosen for one source kind and everything it must supply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub option: String,
    pub items: Vec<ResolvedItem>,
}

impl ResolvedSource {
    pub fn items_of(&self, category: ChoiceCategory) -> impl Iterator<Item = &str> + '_ {
        self.items
            .iter()
            .filter(move |i| i.category == category)
            .map(|i| i.item.as_str())
    }
}

/// Pool assignments grouped by source kind; at most one option per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub sources: BTreeMap<SourceKind, ResolvedSource>,
}

impl ResolvedSelection {
    pub fn option(&self, kind: SourceKind) -> Option<&str> {
        self.sources.get(&kind).map(|s| s.option.as_str())
    }

    pub fn source(&self, kind: SourceKind) -> Option<&ResolvedSource> {
        self.sources.get(&kind)
    }

    pub fn items(&self, kind: SourceKind, category: ChoiceCategory) -> Vec<&str> {
        self.sources
            .get(&kind)
            .map(|s| s.items_of(category).collect())
            .unwrap_or_default()
    }

    /// The pool an item ended up in
    pub fn pool_of(&self, category: ChoiceCategory, item: &str) -> Option<PoolKey> {
        self.sources.iter().find_map(|(kind, source)| {
            source
                .items
                .iter()
                .any(|i| i.category == category && i.item == item)
                .then(|| PoolKey::new(*kind, &source.option))
        })
    }

    pub fn item_count(&self) -> usize {
        self.sources.values().map(|s| s.items.len()).sum()
    }
}

/// Assign every requirement to exactly one pool, most constrained first.
///
/// A pool is eligible when it is already the chosen option of its kind, or its
/// kind is still undecided, and its choice slots can take the item on top of
/// everything already assigned to it. Among
/// eligible pools an already chosen one wins; otherwise the pool with the
/// most outstanding requirements. Greedy, so not globally optimal, but it
/// either satisfies everything or names the requirement it could not place.
pub fn resolve(set: &RequirementSet) -> Result<ResolvedSelection> {
    let mut order: Vec<&ChoiceRequirement> = set.requirements.iter().collect();
    order.sort_by_key(|r| r.candidates.len());

    let mut popularity: HashMap<&PoolKey, usize> = HashMap::new();
    for requirement in &set.requirements {
        for pool in &requirement.candidates {
            *popularity.entry(pool).or_insert(0) += 1;
        }
    }

    let mut chosen: BTreeMap<SourceKind, &PoolKey> = BTreeMap::new();
    let mut assigned: HashMap<&PoolKey, Vec<(ChoiceCategory, &str)>> = HashMap::new();
    let mut selection = ResolvedSelection::default();

    for requirement in order {
        if requirement.candidates.is_empty() {
            return Err(infeasible(requirement, "no pool offers it"));
        }

        let eligible = requirement.candidates.iter().filter(|pool| {
            let kind_open = match chosen.get(&pool.kind) {
                Some(current) => *current == *pool,
                None => true,
            };
            kind_open && {
                let mut items = assigned.get(pool).cloned().unwrap_or_default();
                items.push((requirement.category, requirement.item.as_str()));
                set.capacities.fits(pool, &items)
            }
        });

        let mut pick: Option<&PoolKey> = None;
        for pool in eligible {
            if chosen.get(&pool.kind) == Some(&pool) {
                pick = Some(pool);
                break;
            }
            let better = match pick {
                Some(best) => popularity.get(pool) > popularity.get(best),
                None => true,
            };
            if better {
                pick = Some(pool);
            }
        }

        let Some(pool) = pick else {
            return Err(infeasible(
                requirement,
                "every candidate pool is full or excluded by an earlier choice",
            ));
        };

        log::debug!(
            "Resolved {} '{}' to {}",
            requirement.category,
            requirement.item,
            pool
        );

        if let Some(count) = popularity.get_mut(pool) {
            *count = count.saturating_sub(1);
        }
        assigned
            .entry(pool)
            .or_default()
            .push((requirement.category, requirement.item.as_str()));
        chosen.insert(pool.kind, pool);

        selection
            .sources
            .entry(pool.kind)
            .or_insert_with(|| ResolvedSource {
                option: pool.option.clone(),
                items: Vec::new(),
            })
            .items
            .push(ResolvedItem {
                category: requirement.category,
                item: requirement.item.clone(),
            });
    }

    Ok(selection)
}

fn infeasible(requirement: &ChoiceRequirement, reason: &str) -> ForgeError {
    ForgeError::InfeasibleSelection {
        item: requirement.item.clone(),
        category: requirement.category.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::requirement::PoolCapacities;
    use super::*;
    use crate::content::{ChoiceSlot, OptionPool};

    fn pool(kind: SourceKind, option: &str) -> PoolKey {
        PoolKey::new(kind, option)
    }

    #[test]
    fn test_shared_pool_reused() {
        let background = pool(SourceKind::Background, "Outlander");
        let class = pool(SourceKind::Class, "Fighter");
        let race = pool(SourceKind::Race, "Elf");

        let set = RequirementSet {
            requirements: vec![
                ChoiceRequirement::new(
                    "Acrobatics",
                    ChoiceCategory::Proficiency,
                    vec![background.clone(), class.clone()],
                ),
                ChoiceRequirement::new(
                    "Survival",
                    ChoiceCategory::Proficiency,
                    vec![background.clone(), class.clone(), race.clone()],
                ),
            ],
            capacities: PoolCapacities::default()
                .with(background.clone(), ChoiceCategory::Proficiency, 2)
                .with(class.clone(), ChoiceCategory::Proficiency, 2)
                .with(race.clone(), ChoiceCategory::Proficiency, 0),
        };

        let selection = resolve(&set).unwrap();
        assert_eq!(selection.sources.len(), 1);
        assert_eq!(
            selection.items(SourceKind::Background, ChoiceCategory::Proficiency),
            vec!["Acrobatics", "Survival"]
        );
    }

    #[test]
    fn test_empty_candidates_is_infeasible() {
        let set = RequirementSet {
            requirements: vec![ChoiceRequirement::new("Wish", ChoiceCategory::Spell, vec![])],
            capacities: PoolCapacities::default(),
        };
        let err = resolve(&set).unwrap_err();
        match err {
            ForgeError::InfeasibleSelection { item, .. } => assert_eq!(item, "Wish"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_second_option_of_decided_kind_rejected() {
        let elf = pool(SourceKind::Race, "Elf");
        let dwarf = pool(SourceKind::Race, "Dwarf");
        let set = RequirementSet {
            requirements: vec![
                ChoiceRequirement::new("Elf", ChoiceCategory::Race, vec![elf.clone()]),
                ChoiceRequirement::new("Dwarvish", ChoiceCategory::Language, vec![dwarf.clone()]),
            ],
            capacities: PoolCapacities::default()
                .with(elf, ChoiceCategory::Race, 1)
                .with(dwarf, ChoiceCategory::Language, 2),
        };
        assert!(matches!(
            resolve(&set),
            Err(ForgeError::InfeasibleSelection { .. })
        ));
    }

    #[test]
    fn test_capacity_spills_to_next_kind() {
        let background = pool(SourceKind::Background, "Sage");
        let class = pool(SourceKind::Class, "Wizard");
        let candidates = vec![background.clone(), class.clone()];
        let set = RequirementSet {
            requirements: vec![
                ChoiceRequirement::new("Arcana", ChoiceCategory::Proficiency, candidates.clone()),
                ChoiceRequirement::new("History", ChoiceCategory::Proficiency, candidates.clone()),
                ChoiceRequirement::new("Insight", ChoiceCategory::Proficiency, vec![class.clone()]),
            ],
            capacities: PoolCapacities::default()
                .with(background.clone(), ChoiceCategory::Proficiency, 1)
                .with(class.clone(), ChoiceCategory::Proficiency, 2),
        };

        let selection = resolve(&set).unwrap();
        assert_eq!(selection.item_count(), 3);
        assert_eq!(selection.items(SourceKind::Class, ChoiceCategory::Proficiency).len(), 2);
        assert_eq!(
            selection.items(SourceKind::Background, ChoiceCategory::Proficiency).len(),
            1
        );
    }

    #[test]
    fn test_fixed_grants_leave_open_picks_alone() {
        let class = pool(SourceKind::Class, "Fighter");
        let names = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let slots = vec![
            ChoiceSlot::new(names(&["Athletics", "Survival", "Acrobatics"]), 2),
            ChoiceSlot::fixed(names(&["Light Armor", "Medium Armor", "Heavy Armor", "Shields"])),
        ];
        let mut capacities = PoolCapacities::default();
        capacities.set_pool(class.clone(), ChoiceCategory::Proficiency, OptionPool::new(slots, Vec::new()));
        assert_eq!(capacities.get(&class, ChoiceCategory::Proficiency), 6);

        let requirement = |item: &str| ChoiceRequirement::new(item, ChoiceCategory::Proficiency, vec![class.clone()]);
        let set = RequirementSet {
            requirements: vec![
                requirement("Athletics"),
                requirement("Shields"),
                requirement("Survival"),
                requirement("Acrobatics"),
            ],
            capacities,
        };
        match resolve(&set) {
            Err(ForgeError::InfeasibleSelection { item, .. }) => assert_eq!(item, "Acrobatics"),
            other => panic!("expected Acrobatics to be rejected, got {other:?}"),
        }
    }
}
