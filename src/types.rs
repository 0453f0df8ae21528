use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Highest final score a realized filter allows for an ability
pub const ABILITY_CEILING: i32 = 17;

/// The six ability scores, serialized by their three-letter abbreviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ability {
    #[serde(rename = "STR")]
    Strength,
    #[serde(rename = "DEX")]
    Dexterity,
    #[serde(rename = "CON")]
    Constitution,
    #[serde(rename = "INT")]
    Intelligence,
    #[serde(rename = "WIS")]
    Wisdom,
    #[serde(rename = "CHA")]
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn from_abbreviation(value: &str) -> Option<Ability> {
        Ability::ALL
            .into_iter()
            .find(|a| a.abbreviation().eq_ignore_ascii_case(value.trim()))
    }

    /// Abilities a class may cast spells with
    pub fn is_spellcasting(&self) -> bool {
        matches!(
            self,
            Ability::Intelligence | Ability::Wisdom | Ability::Charisma
        )
    }

    /// Standard modifier, floored: 8-9 -> -1, 10-11 -> 0, 12-13 -> +1
    pub fn modifier(score: i32) -> i32 {
        score.div_euclid(2) - 5
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Skills grouped under the ability that drives them
const SKILLS: &[(&str, Ability)] = &[
    ("Athletics", Ability::Strength),
    ("Acrobatics", Ability::Dexterity),
    ("Sleight of Hand", Ability::Dexterity),
    ("Stealth", Ability::Dexterity),
    ("Arcana", Ability::Intelligence),
    ("History", Ability::Intelligence),
    ("Investigation", Ability::Intelligence),
    ("Nature", Ability::Intelligence),
    ("Religion", Ability::Intelligence),
    ("Animal Handling", Ability::Wisdom),
    ("Insight", Ability::Wisdom),
    ("Medicine", Ability::Wisdom),
    ("Perception", Ability::Wisdom),
    ("Survival", Ability::Wisdom),
    ("Deception", Ability::Charisma),
    ("Intimidation", Ability::Charisma),
    ("Performance", Ability::Charisma),
    ("Persuasion", Ability::Charisma),
];

pub fn skill_ability(skill: &str) -> Option<Ability> {
    SKILLS
        .iter()
        .find(|(name, _)| *name == skill)
        .map(|(_, ability)| *ability)
}

pub fn is_skill(name: &str) -> bool {
    skill_ability(name).is_some()
}

/// Inclusive score range, exchanged as a `[min, max]` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct AbilityRange {
    pub min: i32,
    pub max: i32,
}

impl AbilityRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn exact(score: i32) -> Self {
        Self::new(score, score)
    }

    pub fn contains(&self, score: i32) -> bool {
        self.min <= score && score <= self.max
    }

    /// Narrow this range by another; a max falling below the min is raised to it
    pub fn intersect(&self, other: &AbilityRange) -> AbilityRange {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max).max(min);
        AbilityRange { min, max }
    }
}

impl From<(i32, i32)> for AbilityRange {
    fn from((min, max): (i32, i32)) -> Self {
        Self { min, max }
    }
}

impl From<AbilityRange> for (i32, i32) {
    fn from(range: AbilityRange) -> Self {
        (range.min, range.max)
    }
}

/// Top-level sources a selection can be drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Background,
    Class,
    Race,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Background, SourceKind::Class, SourceKind::Race];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Background => "Background",
            SourceKind::Class => "Class",
            SourceKind::Race => "Race",
        };
        f.write_str(name)
    }
}

/// What kind of thing a requirement asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChoiceCategory {
    Race,
    Subrace,
    Class,
    Subclass,
    Background,
    Proficiency,
    Language,
    Spell,
    Equipment,
    Trait,
}

impl ChoiceCategory {
    /// Core categories name the pool itself rather than something inside it
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            ChoiceCategory::Race
                | ChoiceCategory::Subrace
                | ChoiceCategory::Class
                | ChoiceCategory::Subclass
                | ChoiceCategory::Background
        )
    }
}

impl fmt::Display for ChoiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Addressable keys of a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Race,
    Subrace,
    Class,
    Subclass,
    Background,
    Equipment,
    Spells,
    Proficiencies,
    Languages,
    Skills,
    Ability(Ability),
}

impl FilterKey {
    pub const SCALARS: [FilterKey; 5] = [
        FilterKey::Race,
        FilterKey::Subrace,
        FilterKey::Class,
        FilterKey::Subclass,
        FilterKey::Background,
    ];

    pub const LISTS: [FilterKey; 5] = [
        FilterKey::Equipment,
        FilterKey::Spells,
        FilterKey::Proficiencies,
        FilterKey::Languages,
        FilterKey::Skills,
    ];
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Ability(ability) => write!(f, "Abilities.{}", ability),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// The genotype: every player-visible choice of a build.
///
/// Serializes as a plain `category -> selection` map of strings, lists and
/// `[min, max]` pairs so it can cross a process or UI boundary unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subrace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subclass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spells: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proficiencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub abilities: BTreeMap<Ability, AbilityRange>,
}

impl Filter {
    pub fn with_race(mut self, race: &str) -> Self {
        self.race = Some(race.to_string());
        self
    }

    pub fn with_subrace(mut self, subrace: &str) -> Self {
        self.subrace = Some(subrace.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn with_subclass(mut self, subclass: &str) -> Self {
        self.subclass = Some(subclass.to_string());
        self
    }

    pub fn with_background(mut self, background: &str) -> Self {
        self.background = Some(background.to_string());
        self
    }

    pub fn with_item(mut self, key: FilterKey, item: &str) -> Self {
        if let Some(list) = self.list_mut(key) {
            list.push(item.to_string());
        }
        self
    }

    pub fn with_ability(mut self, ability: Ability, range: AbilityRange) -> Self {
        self.abilities.insert(ability, range);
        self
    }

    pub fn scalar(&self, key: FilterKey) -> Option<&String> {
        match key {
            FilterKey::Race => self.race.as_ref(),
            FilterKey::Subrace => self.subrace.as_ref(),
            FilterKey::Class => self.class.as_ref(),
            FilterKey::Subclass => self.subclass.as_ref(),
            FilterKey::Background => self.background.as_ref(),
            _ => None,
        }
    }

    pub fn scalar_mut(&mut self, key: FilterKey) -> Option<&mut Option<String>> {
        match key {
            FilterKey::Race => Some(&mut self.race),
            FilterKey::Subrace => Some(&mut self.subrace),
            FilterKey::Class => Some(&mut self.class),
            FilterKey::Subclass => Some(&mut self.subclass),
            FilterKey::Background => Some(&mut self.background),
            _ => None,
        }
    }

    pub fn list(&self, key: FilterKey) -> &[String] {
        match key {
            FilterKey::Equipment => &self.equipment,
            FilterKey::Spells => &self.spells,
            FilterKey::Proficiencies => &self.proficiencies,
            FilterKey::Languages => &self.languages,
            FilterKey::Skills => &self.skills,
            _ => &[],
        }
    }

    pub fn list_mut(&mut self, key: FilterKey) -> Option<&mut Vec<String>> {
        match key {
            FilterKey::Equipment => Some(&mut self.equipment),
            FilterKey::Spells => Some(&mut self.spells),
            FilterKey::Proficiencies => Some(&mut self.proficiencies),
            FilterKey::Languages => Some(&mut self.languages),
            FilterKey::Skills => Some(&mut self.skills),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Filter::default()
    }
}
