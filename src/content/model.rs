use super::armor::ArmorClass;
use super::dice::DiceFormula;
use crate::types::{is_skill, Ability, ChoiceCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn first_level() -> u32 {
    1
}

fn default_size() -> String {
    "Medium".to_string()
}

fn default_speed() -> u32 {
    30
}

fn single() -> u32 {
    1
}

/// Which proficiency list a granted proficiency lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProficiencyGroup {
    Armor,
    Weapons,
    Tools,
    SavingThrows,
    Skills,
}

/// A named group of options a source hands out.
///
/// `amount` is how many options must be picked; when absent every option is
/// granted outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoicePoint {
    pub category: ChoiceCategory,
    #[serde(default)]
    pub amount: Option<usize>,
    #[serde(default = "first_level")]
    pub required_level: u32,
    #[serde(default)]
    pub group: Option<ProficiencyGroup>,
    pub options: Vec<String>,
}

impl ChoicePoint {
    pub fn amount(&self) -> usize {
        self.amount
            .unwrap_or(self.options.len())
            .min(self.options.len())
    }

    pub fn is_fixed(&self) -> bool {
        self.amount() == self.options.len()
    }

    pub fn is_available(&self, level: u32) -> bool {
        self.required_level <= level
    }

    pub fn offers(&self, item: &str) -> bool {
        self.options.iter().any(|o| o == item)
    }

    /// Skills are recognised by name; everything else falls back to the point's group
    pub fn group_for(&self, item: &str) -> ProficiencyGroup {
        if is_skill(item) {
            ProficiencyGroup::Skills
        } else {
            self.group.unwrap_or(ProficiencyGroup::Tools)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubraceDef {
    pub name: String,
    #[serde(default)]
    pub speed: Option<u32>,
    #[serde(default)]
    pub darkvision: Option<bool>,
    #[serde(default)]
    pub ability_bonuses: BTreeMap<Ability, i32>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub options: Vec<ChoicePoint>,
    #[serde(default)]
    pub spell_ability: Option<Ability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceDef {
    pub name: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_speed")]
    pub speed: u32,
    #[serde(default)]
    pub darkvision: bool,
    #[serde(default)]
    pub ability_bonuses: BTreeMap<Ability, i32>,
    /// Bonus that follows the class's main ability instead of a fixed one
    #[serde(default)]
    pub flexible_bonus: Option<i32>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub options: Vec<ChoicePoint>,
    #[serde(default)]
    pub spell_ability: Option<Ability>,
    #[serde(default)]
    pub subraces: Vec<SubraceDef>,
}

impl RaceDef {
    pub fn subrace(&self, name: &str) -> Option<&SubraceDef> {
        self.subraces.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellProgression {
    #[serde(default)]
    pub cantrips_known: usize,
    #[serde(default)]
    pub spells_known: usize,
    /// Slot counts indexed by spell level minus one
    #[serde(default)]
    pub spell_slots: Vec<u32>,
}

impl SpellProgression {
    pub fn max_spell_level(&self) -> u32 {
        self.spell_slots
            .iter()
            .rposition(|&count| count > 0)
            .map_or(0, |idx| idx as u32 + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicDef {
    #[serde(default)]
    pub prepared: bool,
    #[serde(default)]
    pub preparation_ability: Option<Ability>,
    #[serde(default)]
    pub spell_list: Vec<String>,
    /// One entry per character level starting at 1; the last entry covers higher levels
    pub progression: Vec<SpellProgression>,
}

impl MagicDef {
    pub fn at_level(&self, level: u32) -> Option<&SpellProgression> {
        let idx = level.saturating_sub(1) as usize;
        self.progression.get(idx).or_else(|| self.progression.last())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubclassDef {
    pub name: String,
    #[serde(default = "first_level")]
    pub required_level: u32,
    #[serde(default)]
    pub second_ability: Option<Ability>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub options: Vec<ChoicePoint>,
    #[serde(default)]
    pub magic: Option<MagicDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub hit_die: i32,
    /// Either one main ability, or two the build picks between
    pub main_abilities: Vec<Ability>,
    pub second_ability: Ability,
    #[serde(default)]
    pub saving_throws: Vec<Ability>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub options: Vec<ChoicePoint>,
    #[serde(default)]
    pub equipment: EquipmentTree,
    #[serde(default)]
    pub magic: Option<MagicDef>,
    #[serde(default)]
    pub subclasses: Vec<SubclassDef>,
}

impl ClassDef {
    pub fn subclass(&self, name: &str) -> Option<&SubclassDef> {
        self.subclasses.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundDef {
    pub name: String,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub options: Vec<ChoicePoint>,
}

impl BackgroundDef {
    pub fn supplies(&self, category: ChoiceCategory) -> bool {
        self.options.iter().any(|p| p.category == category)
    }
}

/// Index of a node inside an [`EquipmentTree`]
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentGrant {
    pub item: String,
    #[serde(default = "single")]
    pub amount: u32,
}

/// One choice group of a class's starting equipment.
///
/// A node offering a choice hands out exactly one of its alternatives; other
/// nodes hand out all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentNode {
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub has_choice: bool,
    #[serde(default)]
    pub items: Vec<EquipmentGrant>,
}

/// An alternative of a node: a single item or a whole child bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alternative<'a> {
    Item(&'a EquipmentGrant),
    Bundle(NodeId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentTree {
    pub nodes: Vec<EquipmentNode>,
}

impl EquipmentTree {
    pub fn node(&self, id: NodeId) -> Option<&EquipmentNode> {
        self.nodes.get(id)
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(id))
            .map(|(child, _)| child)
    }

    pub fn alternatives(&self, id: NodeId) -> Vec<Alternative<'_>> {
        let mut alternatives: Vec<Alternative<'_>> = match self.node(id) {
            Some(node) => node.items.iter().map(Alternative::Item).collect(),
            None => return Vec::new(),
        };
        alternatives.extend(self.children(id).map(Alternative::Bundle));
        alternatives
    }

    pub fn choice_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.has_choice)
            .map(|(id, _)| id)
            .collect()
    }

    /// Every item reachable from a node, including nested bundles
    pub fn subtree_items(&self, id: NodeId) -> Vec<&str> {
        let mut items = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node(current) {
                items.extend(node.items.iter().map(|g| g.item.as_str()));
                stack.extend(self.children(current));
            }
        }
        items
    }

    pub fn alternative_items<'a>(&'a self, alternative: &Alternative<'a>) -> Vec<&'a str> {
        match alternative {
            Alternative::Item(grant) => vec![grant.item.as_str()],
            Alternative::Bundle(child) => self.subtree_items(*child),
        }
    }

    pub fn all_items(&self) -> Vec<&str> {
        let mut items: Vec<&str> = self
            .nodes
            .iter()
            .flat_map(|n| n.items.iter().map(|g| g.item.as_str()))
            .collect();
        items.sort_unstable();
        items.dedup();
        items
    }

    /// Parent links must point at an earlier node, which also rules out cycles
    pub fn check_links(&self) -> Result<(), String> {
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                if parent >= id {
                    return Err(format!(
                        "equipment node {} has parent {} which is not an earlier node",
                        id, parent
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentDef {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub generic_tags: Vec<String>,
    #[serde(default)]
    pub damage: Option<DiceFormula>,
    #[serde(default)]
    pub armor_class: Option<ArmorClass>,
}

impl EquipmentDef {
    /// Item worth used when scoring generic tags
    pub fn power(&self) -> f64 {
        if let Some(armor) = &self.armor_class {
            (armor.nominal() - 10) as f64 / 4.0
        } else if let Some(dice) = &self.damage {
            dice.power()
        } else {
            0.0
        }
    }

    pub fn is_shield(&self) -> bool {
        matches!(self.armor_class, Some(ac) if ac.is_bonus())
    }

    pub fn is_body_armor(&self) -> bool {
        matches!(self.armor_class, Some(ac) if !ac.is_bonus())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellDef {
    pub name: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub damage: Option<DiceFormula>,
    #[serde(default)]
    pub generic_tags: Vec<String>,
}

impl SpellDef {
    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub generic_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeDef {
    pub name: String,
    #[serde(default)]
    pub health_weight: f64,
    #[serde(default)]
    pub magic_weight: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(item: &str) -> EquipmentGrant {
        EquipmentGrant {
            item: item.to_string(),
            amount: 1,
        }
    }

    fn sample_tree() -> EquipmentTree {
        EquipmentTree {
            nodes: vec![
                // (a) a longsword or (b) two simple weapons
                EquipmentNode { parent: None, has_choice: true, items: vec![grant("Longsword")] },
                EquipmentNode { parent: Some(0), has_choice: false, items: vec![grant("Club"), grant("Dagger")] },
                EquipmentNode { parent: None, has_choice: false, items: vec![grant("Explorer's Pack")] },
            ],
        }
    }

    #[test]
    fn test_choice_point_amount_defaults_to_all() {
        let point = ChoicePoint {
            category: ChoiceCategory::Language,
            amount: None,
            required_level: 1,
            group: None,
            options: vec!["Common".into(), "Elvish".into()],
        };
        assert_eq!(point.amount(), 2);
        assert!(point.is_fixed());
    }

    #[test]
    fn test_tree_alternatives_include_bundles() {
        let tree = sample_tree();
        let alternatives = tree.alternatives(0);
        assert_eq!(alternatives.len(), 2);
        assert_eq!(tree.alternative_items(&alternatives[1]), vec!["Club", "Dagger"]);
        assert_eq!(tree.roots().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(tree.choice_nodes(), vec![0]);
        assert!(tree.check_links().is_ok());
    }

    #[test]
    fn test_forward_parent_link_rejected() {
        let mut tree = sample_tree();
        tree.nodes[0].parent = Some(1);
        assert!(tree.check_links().is_err());
    }

    #[test]
    fn test_equipment_power() {
        let plate = EquipmentDef {
            name: "Chain Mail".into(),
            tags: vec![],
            generic_tags: vec![],
            damage: None,
            armor_class: Some(ArmorClass::Flat(16)),
        };
        assert_eq!(plate.power(), 1.5);
        assert!(plate.is_body_armor());
    }
}
