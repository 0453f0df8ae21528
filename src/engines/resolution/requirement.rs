use crate::content::{ContentRepository, OptionPool};
use crate::error::{ForgeError, Result};
use crate::types::{ChoiceCategory, Filter, SourceKind};
use std::collections::HashMap;
use std::fmt;

/// A single source option able to supply items, e.g. the background "Outlander"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub kind: SourceKind,
    pub option: String,
}

impl PoolKey {
    pub fn new(kind: SourceKind, option: impl Into<String>) -> Self {
        Self {
            kind,
            option: option.into(),
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.option)
    }
}

/// An item to obtain and every pool that could legally supply it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRequirement {
    pub item: String,
    pub category: ChoiceCategory,
    pub candidates: Vec<PoolKey>,
}

impl ChoiceRequirement {
    pub fn new(item: impl Into<String>, category: ChoiceCategory, candidates: Vec<PoolKey>) -> Self {
        Self {
            item: item.into(),
            category,
            candidates,
        }
    }
}

/// What one pool can hand out for one category
#[derive(Debug, Clone)]
enum Supply {
    /// A bare count with no choice point structure behind it
    Count(usize),
    Slots(OptionPool),
}

impl Supply {
    fn capacity(&self) -> usize {
        match self {
            Supply::Count(count) => *count,
            Supply::Slots(pool) => pool.capacity,
        }
    }

    fn variants(&self) -> Vec<&str> {
        match self {
            Supply::Count(_) => Vec::new(),
            Supply::Slots(pool) => pool.variant_names().collect(),
        }
    }

    fn fits(&self, variant: Option<&str>, items: &[&str]) -> bool {
        match self {
            Supply::Count(count) => items.len() <= *count,
            Supply::Slots(pool) => pool.fits_variant(variant, items),
        }
    }
}

/// What every pool may hand out, per category
#[derive(Debug, Clone, Default)]
pub struct PoolCapacities {
    supplies: HashMap<(PoolKey, ChoiceCategory), Supply>,
}

impl PoolCapacities {
    /// A plain count: any `capacity` items of the category fit
    pub fn set(&mut self, pool: PoolKey, category: ChoiceCategory, capacity: usize) {
        self.supplies.insert((pool, category), Supply::Count(capacity));
    }

    pub fn with(mut self, pool: PoolKey, category: ChoiceCategory, capacity: usize) -> Self {
        self.set(pool, category, capacity);
        self
    }

    /// Items must fit the pool's choice slots
    pub fn set_pool(&mut self, pool: PoolKey, category: ChoiceCategory, options: OptionPool) {
        self.supplies.insert((pool, category), Supply::Slots(options));
    }

    pub fn get(&self, pool: &PoolKey, category: ChoiceCategory) -> usize {
        self.supplies
            .get(&(pool.clone(), category))
            .map_or(0, Supply::capacity)
    }

    fn contains(&self, pool: &PoolKey, category: ChoiceCategory) -> bool {
        self.supplies.contains_key(&(pool.clone(), category))
    }

    /// Whether `pool` can hand out all of `items` at once. Every category must
    /// fit the same variant, since a source takes only one.
    pub fn fits(&self, pool: &PoolKey, items: &[(ChoiceCategory, &str)]) -> bool {
        let mut categories: Vec<ChoiceCategory> = items.iter().map(|(c, _)| *c).collect();
        categories.sort();
        categories.dedup();

        let mut supplies: Vec<(&Supply, Vec<&str>)> = Vec::with_capacity(categories.len());
        for category in categories {
            let Some(supply) = self.supplies.get(&(pool.clone(), category)) else {
                return false;
            };
            let of_category = items
                .iter()
                .filter(|(c, _)| *c == category)
                .map(|(_, item)| *item)
                .collect();
            supplies.push((supply, of_category));
        }

        let mut variants: Vec<&str> = supplies.iter().flat_map(|(s, _)| s.variants()).collect();
        variants.sort_unstable();
        variants.dedup();

        let fits_with = |variant: Option<&str>| supplies.iter().all(|(s, of)| s.fits(variant, of));
        if variants.is_empty() {
            fits_with(None)
        } else {
            variants.into_iter().any(|v| fits_with(Some(v)))
        }
    }
}

/// Requirements plus the capacities of every pool they mention
#[derive(Debug, Clone, Default)]
pub struct RequirementSet {
    pub requirements: Vec<ChoiceRequirement>,
    pub capacities: PoolCapacities,
}

impl RequirementSet {
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Source kinds allowed to supply a category of list item
fn supplying_kinds(category: ChoiceCategory) -> &'static [SourceKind] {
    match category {
        ChoiceCategory::Proficiency | ChoiceCategory::Language => &SourceKind::ALL,
        ChoiceCategory::Spell => &[SourceKind::Race, SourceKind::Class],
        ChoiceCategory::Equipment => &[SourceKind::Class],
        _ => &[],
    }
}

/// Translate a genotype into the requirements the resolver must satisfy.
///
/// Named core options that do not exist are content errors; list items no
/// source offers become requirements without candidates so the resolver can
/// report them.
pub fn requirements_from_filter(
    repo: &dyn ContentRepository,
    filter: &Filter,
    level: u32,
) -> Result<RequirementSet> {
    let mut set = RequirementSet::default();
    let mut pinned: Vec<(PoolKey, &str)> = Vec::new();

    if let Some(race) = &filter.race {
        repo.race(race).ok_or_else(|| ForgeError::not_found("Race", race))?;
        push_core(&mut set, race, ChoiceCategory::Race, PoolKey::new(SourceKind::Race, race));
    }
    if let Some(subrace) = &filter.subrace {
        let parent = repo
            .race_of_subrace(subrace)
            .ok_or_else(|| ForgeError::not_found("Subrace", subrace))?;
        let pool = PoolKey::new(SourceKind::Race, &parent.name);
        pinned.push((pool.clone(), subrace.as_str()));
        push_core(&mut set, subrace, ChoiceCategory::Subrace, pool);
    }
    if let Some(class) = &filter.class {
        repo.class(class).ok_or_else(|| ForgeError::not_found("Class", class))?;
        push_core(&mut set, class, ChoiceCategory::Class, PoolKey::new(SourceKind::Class, class));
    }
    if let Some(subclass) = &filter.subclass {
        let parent = repo
            .class_of_subclass(subclass)
            .ok_or_else(|| ForgeError::not_found("Subclass", subclass))?;
        let pool = PoolKey::new(SourceKind::Class, &parent.name);
        pinned.push((pool.clone(), subclass.as_str()));
        let capacity = repo
            .option_pool(ChoiceCategory::Subclass, SourceKind::Class, &parent.name, level)
            .filter(|p| p.offers(subclass))
            .map_or(0, |p| p.capacity);
        set.requirements.push(ChoiceRequirement::new(
            subclass.as_str(),
            ChoiceCategory::Subclass,
            if capacity > 0 { vec![pool.clone()] } else { Vec::new() },
        ));
        set.capacities.set(pool, ChoiceCategory::Subclass, capacity);
    }
    if let Some(background) = &filter.background {
        repo.background(background)
            .ok_or_else(|| ForgeError::not_found("Background", background))?;
        push_core(
            &mut set,
            background,
            ChoiceCategory::Background,
            PoolKey::new(SourceKind::Background, background),
        );
    }

    let mut proficiencies: Vec<&String> = filter.proficiencies.iter().chain(&filter.skills).collect();
    dedup_in_order(&mut proficiencies);
    let mut languages: Vec<&String> = filter.languages.iter().collect();
    dedup_in_order(&mut languages);
    let mut spells: Vec<&String> = filter.spells.iter().collect();
    dedup_in_order(&mut spells);
    let equipment: Vec<&String> = filter.equipment.iter().collect();

    let lists = [
        (ChoiceCategory::Proficiency, proficiencies),
        (ChoiceCategory::Language, languages),
        (ChoiceCategory::Spell, spells),
        (ChoiceCategory::Equipment, equipment),
    ];

    for (category, items) in lists {
        for item in items {
            let candidates = candidate_pools(repo, category, item, level, &pinned, &mut set.capacities);
            set.requirements
                .push(ChoiceRequirement::new(item.as_str(), category, candidates));
        }
    }

    Ok(set)
}

fn push_core(set: &mut RequirementSet, item: &str, category: ChoiceCategory, pool: PoolKey) {
    set.requirements
        .push(ChoiceRequirement::new(item, category, vec![pool.clone()]));
    set.capacities.set(pool, category, 1);
}

fn candidate_pools(
    repo: &dyn ContentRepository,
    category: ChoiceCategory,
    item: &str,
    level: u32,
    pinned: &[(PoolKey, &str)],
    capacities: &mut PoolCapacities,
) -> Vec<PoolKey> {
    let mut candidates = Vec::new();
    for &kind in supplying_kinds(category) {
        for id in repo.source_ids(kind) {
            let key = PoolKey::new(kind, id);
            let Some(mut pool) = repo.option_pool(category, kind, &key.option, level) else {
                continue;
            };
            if let Some((_, variant)) = pinned.iter().find(|(p, _)| *p == key) {
                pool.restrict_to(variant);
            }
            if !pool.offers(item) {
                continue;
            }
            if !capacities.contains(&key, category) {
                capacities.set_pool(key.clone(), category, pool);
            }
            candidates.push(key);
        }
    }
    candidates
}

fn dedup_in_order(items: &mut Vec<&String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.as_str()));
}
