use crate::content::EquipmentGrant;
use crate::types::{skill_ability, Ability, AbilityRange, ChoiceCategory, Filter, SourceKind, ABILITY_CEILING};
use serde::Serialize;
use std::collections::BTreeMap;

/// Proficiencies of a build, split by the list they belong to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProficiencySet {
    pub armor: Vec<String>,
    pub weapons: Vec<String>,
    pub tools: Vec<String>,
    pub saving_throws: Vec<Ability>,
    pub skills: Vec<String>,
}

impl ProficiencySet {
    pub fn contains(&self, name: &str) -> bool {
        self.armor
            .iter()
            .chain(&self.weapons)
            .chain(&self.tools)
            .chain(&self.skills)
            .any(|p| p == name)
            || Ability::from_abbreviation(name).map_or(false, |a| self.saving_throws.contains(&a))
    }

    /// Armor, weapon and tool proficiencies; skills and saving throws are kept apart
    pub fn general(&self) -> impl Iterator<Item = &String> {
        self.armor.iter().chain(&self.weapons).chain(&self.tools)
    }
}

/// One set of spells cast with a single ability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spellcasting {
    pub source: SourceKind,
    pub ability: Ability,
    /// Cantrips and spells that are always available
    pub known: Vec<String>,
    /// Leveled spells a prepared caster may pick from each day
    pub prepared_options: Vec<String>,
    pub prepared: Vec<String>,
    pub prepared_budget: usize,
    /// Slot counts indexed by spell level minus one
    pub spell_slots: Vec<u32>,
}

impl Spellcasting {
    pub fn new(source: SourceKind, ability: Ability) -> Self {
        Self {
            source,
            ability,
            known: Vec::new(),
            prepared_options: Vec::new(),
            prepared: Vec::new(),
            prepared_budget: 0,
            spell_slots: Vec::new(),
        }
    }
}

/// An item a source handed out through one of its choice points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcedGrant {
    pub source: SourceKind,
    pub category: ChoiceCategory,
    pub item: String,
}

/// A fully computed character
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Build {
    pub level: u32,
    pub race: String,
    pub subrace: Option<String>,
    pub class: String,
    pub subclass: Option<String>,
    pub background: String,
    pub size: String,
    pub speed: u32,
    pub darkvision: bool,
    pub hit_die: i32,
    pub main_ability: Ability,
    pub second_ability: Ability,
    pub racial_bonuses: BTreeMap<Ability, i32>,
    /// Final scores, racial bonuses included
    pub ability_scores: BTreeMap<Ability, i32>,
    pub armor_class: i32,
    pub hit_points: i32,
    pub proficiency_bonus: i32,
    pub proficiencies: ProficiencySet,
    pub languages: Vec<String>,
    pub traits: Vec<String>,
    pub equipment: Vec<EquipmentGrant>,
    pub spellcasting: Vec<Spellcasting>,
    /// Which source supplied each chosen or granted list item. Prepared
    /// spells are left out since they follow the daily preparation budget.
    pub grants: Vec<SourcedGrant>,
}

impl Build {
    pub fn score(&self, ability: Ability) -> i32 {
        self.ability_scores.get(&ability).copied().unwrap_or(10)
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        Ability::modifier(self.score(ability))
    }

    /// Score before racial bonuses, i.e. what point-buy paid for
    pub fn base_score(&self, ability: Ability) -> i32 {
        self.score(ability) - self.racial_bonuses.get(&ability).copied().unwrap_or(0)
    }

    /// Check value of a proficiency: skills add their ability modifier
    pub fn proficiency_value(&self, proficiency: &str) -> i32 {
        match skill_ability(proficiency) {
            Some(ability) => self.proficiency_bonus + self.modifier(ability),
            None => self.proficiency_bonus,
        }
    }

    /// Distinct equipment names in the order they were granted
    pub fn equipment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for grant in &self.equipment {
            if !names.contains(&grant.item.as_str()) {
                names.push(&grant.item);
            }
        }
        names
    }

    pub fn equipment_count(&self, item: &str) -> u32 {
        self.equipment
            .iter()
            .filter(|g| g.item == item)
            .map(|g| g.amount)
            .sum()
    }

    pub fn known_spells(&self) -> impl Iterator<Item = &String> {
        self.spellcasting.iter().flat_map(|s| s.known.iter())
    }

    pub fn prepared_spell_options(&self) -> impl Iterator<Item = &String> {
        self.spellcasting.iter().flat_map(|s| s.prepared_options.iter())
    }

    /// Every spell name the build can cast, without repeats
    pub fn spell_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for spell in self
            .spellcasting
            .iter()
            .flat_map(|s| s.known.iter().chain(&s.prepared))
        {
            if !names.contains(&spell.as_str()) {
                names.push(spell);
            }
        }
        names
    }

    pub fn is_spellcaster(&self) -> bool {
        self.spellcasting
            .iter()
            .any(|s| s.source == SourceKind::Class)
    }

    pub fn granted_by(&self, source: SourceKind, category: ChoiceCategory) -> Vec<&str> {
        self.grants
            .iter()
            .filter(|g| g.source == source && g.category == category)
            .map(|g| g.item.as_str())
            .collect()
    }

    /// Whether the build ended up with an item, whoever supplied it
    pub fn holds(&self, category: ChoiceCategory, item: &str) -> bool {
        match category {
            ChoiceCategory::Race => self.race == item,
            ChoiceCategory::Subrace => self.subrace.as_deref() == Some(item),
            ChoiceCategory::Class => self.class == item,
            ChoiceCategory::Subclass => self.subclass.as_deref() == Some(item),
            ChoiceCategory::Background => self.background == item,
            ChoiceCategory::Proficiency => self.proficiencies.contains(item),
            ChoiceCategory::Language => self.languages.iter().any(|l| l == item),
            ChoiceCategory::Spell => self.spell_names().contains(&item),
            ChoiceCategory::Equipment => self.equipment.iter().any(|g| g.item == item),
            ChoiceCategory::Trait => self.traits.iter().any(|t| t == item),
        }
    }

    /// Re-emit the genotype this build realizes
    pub fn to_filter(&self) -> Filter {
        Filter {
            race: Some(self.race.clone()),
            subrace: self.subrace.clone(),
            class: Some(self.class.clone()),
            subclass: self.subclass.clone(),
            background: Some(self.background.clone()),
            equipment: self.equipment_names().into_iter().map(str::to_string).collect(),
            spells: self.spell_names().into_iter().map(str::to_string).collect(),
            proficiencies: self.proficiencies.general().cloned().collect(),
            languages: self.languages.clone(),
            skills: self.proficiencies.skills.clone(),
            abilities: self
                .ability_scores
                .iter()
                .map(|(&ability, &score)| (ability, AbilityRange::new(score, ABILITY_CEILING.max(score))))
                .collect(),
        }
    }
}
