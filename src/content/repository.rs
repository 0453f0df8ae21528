use super::model::{
    ArchetypeDef, BackgroundDef, ChoicePoint, ClassDef, EquipmentDef, MagicDef, RaceDef, SpellDef,
    TraitDef,
};
use super::pool::{ChoiceSlot, OptionPool};
use crate::error::{ForgeError, Result};
use crate::types::{Ability, ChoiceCategory, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Gating and cardinality of a single choice point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceMetadata {
    pub category: ChoiceCategory,
    pub required_level: u32,
    pub amount: usize,
}

/// Read-only access to races, classes, backgrounds and everything they grant.
///
/// Implementations are shared between worker threads for the whole run and
/// must not change underneath it.
pub trait ContentRepository: Send + Sync {
    fn source_ids(&self, kind: SourceKind) -> Vec<String>;
    fn race(&self, name: &str) -> Option<&RaceDef>;
    fn class(&self, name: &str) -> Option<&ClassDef>;
    fn background(&self, name: &str) -> Option<&BackgroundDef>;
    fn equipment(&self, name: &str) -> Option<&EquipmentDef>;
    fn spell(&self, name: &str) -> Option<&SpellDef>;
    fn trait_def(&self, name: &str) -> Option<&TraitDef>;
    fn archetype(&self, name: &str) -> Option<&ArchetypeDef>;
    fn tag_proficiencies(&self, tag: &str) -> &[String];
    fn tag_generic_tags(&self, tag: &str) -> &[String];
    fn tag_ability(&self, tag: &str) -> Option<Ability>;

    fn race_of_subrace(&self, subrace: &str) -> Option<&RaceDef> {
        self.source_ids(SourceKind::Race)
            .iter()
            .filter_map(|id| self.race(id))
            .find(|race| race.subrace(subrace).is_some())
    }

    fn class_of_subclass(&self, subclass: &str) -> Option<&ClassDef> {
        self.source_ids(SourceKind::Class)
            .iter()
            .filter_map(|id| self.class(id))
            .find(|class| class.subclass(subclass).is_some())
    }

    /// Choice points declared directly by a source or one of its variants
    fn choice_points(&self, kind: SourceKind, id: &str) -> Vec<&ChoicePoint> {
        match kind {
            SourceKind::Race => match self.race(id) {
                Some(race) => race.options.iter().collect(),
                None => self
                    .race_of_subrace(id)
                    .and_then(|race| race.subrace(id))
                    .map(|sub| sub.options.iter().collect())
                    .unwrap_or_default(),
            },
            SourceKind::Class => match self.class(id) {
                Some(class) => class.options.iter().collect(),
                None => self
                    .class_of_subclass(id)
                    .and_then(|class| class.subclass(id))
                    .map(|sub| sub.options.iter().collect())
                    .unwrap_or_default(),
            },
            SourceKind::Background => self
                .background(id)
                .map(|bg| bg.options.iter().collect())
                .unwrap_or_default(),
        }
    }

    fn choice_metadata(&self, kind: SourceKind, id: &str, index: usize) -> Option<ChoiceMetadata> {
        self.choice_points(kind, id)
            .get(index)
            .map(|point| ChoiceMetadata {
                category: point.category,
                required_level: point.required_level,
                amount: point.amount(),
            })
    }

    /// Everything a source (with any of its level-appropriate variants) can
    /// supply for a category. `None` when the source does not exist.
    fn option_pool(
        &self,
        category: ChoiceCategory,
        kind: SourceKind,
        id: &str,
        level: u32,
    ) -> Option<OptionPool> {
        match kind {
            SourceKind::Race => {
                let race = self.race(id)?;
                Some(match category {
                    ChoiceCategory::Race => OptionPool::one_of(vec![race.name.clone()]),
                    ChoiceCategory::Subrace => {
                        OptionPool::one_of(race.subraces.iter().map(|s| s.name.clone()).collect())
                    }
                    c if c.is_core() => return None,
                    _ => {
                        let mut pool = PoolBuilder::new(category, level);
                        pool.add_base(&race.traits, &race.options);
                        for sub in &race.subraces {
                            let slots = pool.slots_of(&sub.traits, &sub.options);
                            pool.add_variant(&sub.name, slots);
                        }
                        pool.finish()
                    }
                })
            }
            SourceKind::Class => {
                let class = self.class(id)?;
                let subclasses: Vec<_> = class
                    .subclasses
                    .iter()
                    .filter(|s| s.required_level <= level)
                    .collect();
                Some(match category {
                    ChoiceCategory::Class => OptionPool::one_of(vec![class.name.clone()]),
                    ChoiceCategory::Subclass => {
                        OptionPool::one_of(subclasses.iter().map(|s| s.name.clone()).collect())
                    }
                    c if c.is_core() => return None,
                    ChoiceCategory::Equipment => {
                        let options: Vec<String> = class
                            .equipment
                            .all_items()
                            .into_iter()
                            .map(str::to_string)
                            .collect();
                        OptionPool::new(vec![ChoiceSlot::fixed(options)], Vec::new())
                    }
                    _ => {
                        let mut pool = PoolBuilder::new(category, level);
                        pool.add_base(&class.traits, &class.options);
                        if let Some(magic) = &class.magic {
                            let slots = pool.magic_slots(self, magic);
                            pool.slots.extend(slots);
                        }
                        for sub in subclasses {
                            let mut slots = pool.slots_of(&sub.traits, &sub.options);
                            if let Some(magic) = &sub.magic {
                                slots.extend(pool.magic_slots(self, magic));
                            }
                            pool.add_variant(&sub.name, slots);
                        }
                        pool.finish()
                    }
                })
            }
            SourceKind::Background => {
                let background = self.background(id)?;
                Some(match category {
                    ChoiceCategory::Background => OptionPool::one_of(vec![background.name.clone()]),
                    c if c.is_core() => return None,
                    _ => {
                        let mut pool = PoolBuilder::new(category, level);
                        pool.add_base(&background.traits, &background.options);
                        pool.finish()
                    }
                })
            }
        }
    }

    /// What `id` declares itself, without its variants. A subrace or subclass
    /// id yields just that variant's choice points (and a subclass its magic).
    fn declared_pool(&self, category: ChoiceCategory, kind: SourceKind, id: &str, level: u32) -> OptionPool {
        let mut pool = PoolBuilder::new(category, level);
        pool.add_points(&self.choice_points(kind, id));
        if kind == SourceKind::Class {
            let magic = match self.class(id) {
                Some(class) => class.magic.as_ref(),
                None => self
                    .class_of_subclass(id)
                    .and_then(|class| class.subclass(id))
                    .and_then(|sub| sub.magic.as_ref()),
            };
            if let Some(magic) = magic {
                let slots = pool.magic_slots(self, magic);
                pool.slots.extend(slots);
            }
        }
        pool.finish()
    }

    fn archetype_tag_weights(&self, name: &str) -> Option<&BTreeMap<String, f64>> {
        self.archetype(name).map(|a| &a.tags)
    }

    fn is_weapon(&self, name: &str) -> bool {
        self.equipment(name).map_or(false, |e| e.damage.is_some())
    }
}

/// Gathers the choice slots of one category across a source and its variants
struct PoolBuilder {
    category: ChoiceCategory,
    level: u32,
    slots: Vec<ChoiceSlot>,
    variants: Vec<(String, Vec<ChoiceSlot>)>,
}

impl PoolBuilder {
    fn new(category: ChoiceCategory, level: u32) -> Self {
        Self {
            category,
            level,
            slots: Vec::new(),
            variants: Vec::new(),
        }
    }

    fn slots_of(&self, traits: &[String], points: &[ChoicePoint]) -> Vec<ChoiceSlot> {
        let mut slots = Vec::new();
        if self.category == ChoiceCategory::Trait && !traits.is_empty() {
            slots.push(ChoiceSlot::fixed(traits.to_vec()));
        }
        slots.extend(
            points
                .iter()
                .filter(|p| p.category == self.category && p.is_available(self.level))
                .map(ChoiceSlot::from_point),
        );
        slots
    }

    fn add_base(&mut self, traits: &[String], points: &[ChoicePoint]) {
        let slots = self.slots_of(traits, points);
        self.slots.extend(slots);
    }

    fn add_points(&mut self, points: &[&ChoicePoint]) {
        let (category, level) = (self.category, self.level);
        self.slots.extend(
            points
                .iter()
                .filter(|p| p.category == category && p.is_available(level))
                .map(|p| ChoiceSlot::from_point(p)),
        );
    }

    /// Variants are listed even without slots so every category names the same ones
    fn add_variant(&mut self, name: &str, slots: Vec<ChoiceSlot>) {
        self.variants.push((name.to_string(), slots));
    }

    /// Cantrips and leveled spells as two slots; a prepared caster may hold any castable spell
    fn magic_slots<R: ContentRepository + ?Sized>(&self, repo: &R, magic: &MagicDef) -> Vec<ChoiceSlot> {
        if self.category != ChoiceCategory::Spell {
            return Vec::new();
        }
        let Some(progression) = magic.at_level(self.level) else {
            return Vec::new();
        };
        let max_level = progression.max_spell_level();
        let mut cantrips = Vec::new();
        let mut leveled = Vec::new();
        for name in &magic.spell_list {
            match repo.spell(name) {
                Some(spell) if spell.is_cantrip() => cantrips.push(name.clone()),
                Some(spell) if spell.level <= max_level => leveled.push(name.clone()),
                _ => {}
            }
        }
        let leveled_amount = if magic.prepared {
            leveled.len()
        } else {
            progression.spells_known
        };
        [
            ChoiceSlot::new(cantrips, progression.cantrips_known),
            ChoiceSlot::new(leveled, leveled_amount),
        ]
        .into_iter()
        .filter(|slot| slot.amount > 0)
        .collect()
    }

    fn finish(self) -> OptionPool {
        OptionPool::new(self.slots, self.variants)
    }
}

/// A tag's links to proficiencies, generic tags and (optionally) an ability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagDef {
    pub name: String,
    #[serde(default)]
    pub proficiencies: Vec<String>,
    #[serde(default)]
    pub generic_tags: Vec<String>,
    #[serde(default)]
    pub ability: Option<Ability>,
}

/// Serialized form of a [`Catalogue`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueData {
    pub races: Vec<RaceDef>,
    pub classes: Vec<ClassDef>,
    pub backgrounds: Vec<BackgroundDef>,
    pub equipment: Vec<EquipmentDef>,
    pub spells: Vec<SpellDef>,
    pub traits: Vec<TraitDef>,
    pub archetypes: Vec<ArchetypeDef>,
    pub tags: Vec<TagDef>,
}

fn index_by<T>(items: &[T], name: impl Fn(&T) -> &str) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| (name(item).to_string(), idx))
        .collect()
}

/// In-memory content repository loaded from JSON
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    data: CatalogueData,
    races: HashMap<String, usize>,
    classes: HashMap<String, usize>,
    backgrounds: HashMap<String, usize>,
    equipment: HashMap<String, usize>,
    spells: HashMap<String, usize>,
    traits: HashMap<String, usize>,
    archetypes: HashMap<String, usize>,
    tags: HashMap<String, usize>,
}

impl From<CatalogueData> for Catalogue {
    fn from(data: CatalogueData) -> Self {
        Self {
            races: index_by(&data.races, |r| &r.name),
            classes: index_by(&data.classes, |c| &c.name),
            backgrounds: index_by(&data.backgrounds, |b| &b.name),
            equipment: index_by(&data.equipment, |e| &e.name),
            spells: index_by(&data.spells, |s| &s.name),
            traits: index_by(&data.traits, |t| &t.name),
            archetypes: index_by(&data.archetypes, |a| &a.name),
            tags: index_by(&data.tags, |t| &t.name),
            data,
        }
    }
}

impl Catalogue {
    pub fn from_json(json: &str) -> Result<Self> {
        let data: CatalogueData = serde_json::from_str(json)?;
        Ok(Catalogue::from(data))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn data(&self) -> &CatalogueData {
        &self.data
    }

    fn tag(&self, name: &str) -> Option<&TagDef> {
        self.tags.get(name).map(|&idx| &self.data.tags[idx])
    }

    /// Check that every name the catalogue refers to is defined
    pub fn validate(&self) -> Result<()> {
        let mut problems: Vec<String> = Vec::new();

        check_unique("race", self.data.races.iter().map(|r| r.name.as_str()), &mut problems);
        check_unique("class", self.data.classes.iter().map(|c| c.name.as_str()), &mut problems);
        check_unique(
            "background",
            self.data.backgrounds.iter().map(|b| b.name.as_str()),
            &mut problems,
        );
        check_unique(
            "subrace",
            self.data.races.iter().flat_map(|r| r.subraces.iter().map(|s| s.name.as_str())),
            &mut problems,
        );
        check_unique(
            "subclass",
            self.data.classes.iter().flat_map(|c| c.subclasses.iter().map(|s| s.name.as_str())),
            &mut problems,
        );

        for race in &self.data.races {
            self.check_traits(&race.name, &race.traits, &mut problems);
            self.check_points(&race.name, &race.options, &mut problems);
            for sub in &race.subraces {
                self.check_traits(&sub.name, &sub.traits, &mut problems);
                self.check_points(&sub.name, &sub.options, &mut problems);
            }
        }

        for class in &self.data.classes {
            if class.hit_die <= 0 {
                problems.push(format!("class '{}' has no hit die", class.name));
            }
            if class.main_abilities.is_empty() || class.main_abilities.len() > 2 {
                problems.push(format!("class '{}' needs one or two main abilities", class.name));
            }
            self.check_traits(&class.name, &class.traits, &mut problems);
            self.check_points(&class.name, &class.options, &mut problems);
            if let Err(e) = class.equipment.check_links() {
                problems.push(format!("class '{}': {}", class.name, e));
            }
            for item in class.equipment.all_items() {
                if !self.equipment.contains_key(item) {
                    problems.push(format!("class '{}' grants unknown equipment '{}'", class.name, item));
                }
            }
            let magics = class
                .magic
                .iter()
                .map(|m| (class.name.as_str(), m))
                .chain(class.subclasses.iter().filter_map(|s| s.magic.as_ref().map(|m| (s.name.as_str(), m))));
            for (owner, magic) in magics {
                if magic.progression.is_empty() {
                    problems.push(format!("'{}' has magic without a progression", owner));
                }
                for spell in &magic.spell_list {
                    if !self.spells.contains_key(spell) {
                        problems.push(format!("'{}' lists unknown spell '{}'", owner, spell));
                    }
                }
            }
            for sub in &class.subclasses {
                self.check_traits(&sub.name, &sub.traits, &mut problems);
                self.check_points(&sub.name, &sub.options, &mut problems);
            }
        }

        for background in &self.data.backgrounds {
            self.check_traits(&background.name, &background.traits, &mut problems);
            self.check_points(&background.name, &background.options, &mut problems);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ForgeError::Content(problems.join("; ")))
        }
    }

    fn check_traits(&self, owner: &str, traits: &[String], problems: &mut Vec<String>) {
        for name in traits {
            if !self.traits.contains_key(name) {
                problems.push(format!("'{}' grants unknown trait '{}'", owner, name));
            }
        }
    }

    fn check_points(&self, owner: &str, points: &[ChoicePoint], problems: &mut Vec<String>) {
        for point in points {
            let known: Option<&HashMap<String, usize>> = match point.category {
                ChoiceCategory::Spell => Some(&self.spells),
                ChoiceCategory::Trait => Some(&self.traits),
                ChoiceCategory::Equipment => Some(&self.equipment),
                _ => None,
            };
            let Some(known) = known else { continue };
            for option in &point.options {
                if !known.contains_key(option) {
                    problems.push(format!(
                        "'{}' offers unknown {} '{}'",
                        owner, point.category, option
                    ));
                }
            }
        }
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>, problems: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            problems.push(format!("duplicate {} name '{}'", kind, name));
        }
    }
}

impl ContentRepository for Catalogue {
    fn source_ids(&self, kind: SourceKind) -> Vec<String> {
        match kind {
            SourceKind::Race => self.data.races.iter().map(|r| r.name.clone()).collect(),
            SourceKind::Class => self.data.classes.iter().map(|c| c.name.clone()).collect(),
            SourceKind::Background => self.data.backgrounds.iter().map(|b| b.name.clone()).collect(),
        }
    }

    fn race(&self, name: &str) -> Option<&RaceDef> {
        self.races.get(name).map(|&idx| &self.data.races[idx])
    }

    fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name).map(|&idx| &self.data.classes[idx])
    }

    fn background(&self, name: &str) -> Option<&BackgroundDef> {
        self.backgrounds.get(name).map(|&idx| &self.data.backgrounds[idx])
    }

    fn equipment(&self, name: &str) -> Option<&EquipmentDef> {
        self.equipment.get(name).map(|&idx| &self.data.equipment[idx])
    }

    fn spell(&self, name: &str) -> Option<&SpellDef> {
        self.spells.get(name).map(|&idx| &self.data.spells[idx])
    }

    fn trait_def(&self, name: &str) -> Option<&TraitDef> {
        self.traits.get(name).map(|&idx| &self.data.traits[idx])
    }

    fn archetype(&self, name: &str) -> Option<&ArchetypeDef> {
        self.archetypes.get(name).map(|&idx| &self.data.archetypes[idx])
    }

    fn tag_proficiencies(&self, tag: &str) -> &[String] {
        self.tag(tag).map_or(&[], |t| t.proficiencies.as_slice())
    }

    fn tag_generic_tags(&self, tag: &str) -> &[String] {
        self.tag(tag).map_or(&[], |t| t.generic_tags.as_slice())
    }

    fn tag_ability(&self, tag: &str) -> Option<Ability> {
        self.tag(tag).and_then(|t| t.ability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue() -> Catalogue {
        Catalogue::from_json(include_str!("../../tests/fixtures/catalogue.json")).unwrap()
    }

    #[test]
    fn test_fixture_is_valid() {
        catalogue().validate().unwrap();
    }

    #[test]
    fn test_lookup_by_name() {
        let repo = catalogue();
        assert!(repo.race("Elf").is_some());
        assert!(repo.class("Wizard").is_some());
        assert_eq!(repo.race_of_subrace("High Elf").map(|r| r.name.as_str()), Some("Elf"));
        assert_eq!(repo.class_of_subclass("Champion").map(|c| c.name.as_str()), Some("Fighter"));
        assert!(repo.spell("Fireball").is_none());
    }

    #[test]
    fn test_background_pool_counts_every_point() {
        let repo = catalogue();
        let pool = repo
            .option_pool(ChoiceCategory::Proficiency, SourceKind::Background, "Outlander", 1)
            .unwrap();
        assert!(pool.offers("Athletics"));
        assert!(pool.offers("Survival"));
        assert_eq!(pool.capacity, 3);
    }

    #[test]
    fn test_subclass_gated_by_level() {
        let repo = catalogue();
        let low = repo
            .option_pool(ChoiceCategory::Subclass, SourceKind::Class, "Fighter", 1)
            .unwrap();
        assert!(low.options.is_empty());
        let high = repo
            .option_pool(ChoiceCategory::Subclass, SourceKind::Class, "Fighter", 3)
            .unwrap();
        assert_eq!(high.options, vec!["Champion".to_string()]);
    }

    #[test]
    fn test_choice_metadata() {
        let repo = catalogue();
        let meta = repo.choice_metadata(SourceKind::Class, "Fighter", 0).unwrap();
        assert_eq!(meta.category, ChoiceCategory::Proficiency);
        assert_eq!(meta.amount, 2);
        assert!(repo.choice_metadata(SourceKind::Class, "Fighter", 99).is_none());
    }

    #[test]
    fn test_declared_pool_ignores_other_variants() {
        let repo = catalogue();
        let elf = repo.declared_pool(ChoiceCategory::Language, SourceKind::Race, "Elf", 1);
        assert_eq!(elf.options, vec!["Common".to_string(), "Elvish".to_string()]);
        let high = repo.declared_pool(ChoiceCategory::Language, SourceKind::Race, "High Elf", 1);
        assert!(high.offers("Giant"));
        assert_eq!(high.capacity, 1);

        let trickster = repo.declared_pool(ChoiceCategory::Spell, SourceKind::Class, "Arcane Trickster", 3);
        assert!(trickster.offers("Charm Person"));
        assert_eq!(trickster.capacity, 6);
    }

    #[test]
    fn test_unknown_reference_fails_validation() {
        let mut data = catalogue().data().clone();
        data.races[0].traits.push("Wings".to_string());
        let broken = Catalogue::from(data);
        let err = broken.validate().unwrap_err();
        assert!(err.to_string().contains("Wings"));
    }
}
