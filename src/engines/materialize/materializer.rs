use super::build::{Build, ProficiencySet, SourcedGrant, Spellcasting};
use super::chooser::Chooser;
use super::point_buy::{point_buy, priority_order, purchasable_range};
use crate::content::{
    assign_slots, Alternative, ChoicePoint, ChoiceSlot, ClassDef, ContentRepository, EquipmentGrant,
    EquipmentTree, MagicDef, NodeId, ProficiencyGroup, RaceDef, SubclassDef, SubraceDef,
};
use crate::engines::resolution::{requirements_from_filter, resolve, ResolvedSelection};
use crate::error::{ForgeError, Result};
use crate::types::{Ability, ChoiceCategory, Filter, SourceKind};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Everything handed out by choice points while a build is assembled
#[derive(Default)]
struct Grants {
    proficiencies: ProficiencySet,
    languages: Vec<String>,
    traits: Vec<String>,
    racial_spells: Vec<String>,
    class_spells: Vec<String>,
    equipment: Vec<EquipmentGrant>,
    sourced: Vec<SourcedGrant>,
}

impl Grants {
    fn held(&self, category: ChoiceCategory) -> HashSet<String> {
        match category {
            ChoiceCategory::Proficiency => self
                .proficiencies
                .general()
                .chain(&self.proficiencies.skills)
                .cloned()
                .collect(),
            ChoiceCategory::Language => self.languages.iter().cloned().collect(),
            ChoiceCategory::Trait => self.traits.iter().cloned().collect(),
            ChoiceCategory::Spell => self
                .racial_spells
                .iter()
                .chain(&self.class_spells)
                .cloned()
                .collect(),
            ChoiceCategory::Equipment => self.equipment.iter().map(|g| g.item.clone()).collect(),
            _ => HashSet::new(),
        }
    }

    fn record(&mut self, source: SourceKind, category: ChoiceCategory, item: &str) {
        let known = self
            .sourced
            .iter()
            .any(|g| g.source == source && g.category == category && g.item == item);
        if !known {
            self.sourced.push(SourcedGrant {
                source,
                category,
                item: item.to_string(),
            });
        }
    }

    fn grant(&mut self, kind: SourceKind, point: &ChoicePoint, item: &str) {
        self.record(kind, point.category, item);
        let push = |list: &mut Vec<String>| {
            if !list.iter().any(|i| i == item) {
                list.push(item.to_string());
            }
        };
        match point.category {
            ChoiceCategory::Proficiency => match point.group_for(item) {
                ProficiencyGroup::Armor => push(&mut self.proficiencies.armor),
                ProficiencyGroup::Weapons => push(&mut self.proficiencies.weapons),
                ProficiencyGroup::Tools => push(&mut self.proficiencies.tools),
                ProficiencyGroup::Skills => push(&mut self.proficiencies.skills),
                ProficiencyGroup::SavingThrows => {
                    if let Some(ability) = Ability::from_abbreviation(item) {
                        if !self.proficiencies.saving_throws.contains(&ability) {
                            self.proficiencies.saving_throws.push(ability);
                        }
                    }
                }
            },
            ChoiceCategory::Language => push(&mut self.languages),
            ChoiceCategory::Trait => push(&mut self.traits),
            ChoiceCategory::Spell if kind == SourceKind::Race => push(&mut self.racial_spells),
            ChoiceCategory::Spell => push(&mut self.class_spells),
            ChoiceCategory::Equipment => self.equipment.push(EquipmentGrant {
                item: item.to_string(),
                amount: 1,
            }),
            _ => {}
        }
    }
}

/// A source's own traits and choice points
struct SourceGrants<'c> {
    kind: SourceKind,
    traits: &'c [String],
    points: &'c [ChoicePoint],
}

/// Turns a genotype into a [`Build`] using a content repository
pub struct Materializer<'a> {
    repo: &'a dyn ContentRepository,
    level: u32,
}

impl<'a> Materializer<'a> {
    pub fn new(repo: &'a dyn ContentRepository, level: u32) -> Self {
        Self { repo, level }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Resolve a filter against the repository and materialize the result
    pub fn build<R: Rng>(&self, filter: &Filter, rng: &mut R) -> Result<Build> {
        let requirements = requirements_from_filter(self.repo, filter, self.level)?;
        let selection = resolve(&requirements)?;
        self.materialize(&selection, filter, rng)
    }

    pub fn materialize<R: Rng>(
        &self,
        selection: &ResolvedSelection,
        filter: &Filter,
        rng: &mut R,
    ) -> Result<Build> {
        let mut chooser = Chooser::new(rng);

        let background_name = self.core_option(selection, SourceKind::Background, &mut chooser)?;
        let background = self
            .repo
            .background(&background_name)
            .ok_or_else(|| ForgeError::not_found("Background", &background_name))?;

        let race_name = self.core_option(selection, SourceKind::Race, &mut chooser)?;
        let race = self
            .repo
            .race(&race_name)
            .ok_or_else(|| ForgeError::not_found("Race", &race_name))?;
        let subrace = self.pick_subrace(race, selection, &mut chooser)?;

        let class_name = self.core_option(selection, SourceKind::Class, &mut chooser)?;
        let class = self
            .repo
            .class(&class_name)
            .ok_or_else(|| ForgeError::not_found("Class", &class_name))?;
        let subclass = self.pick_subclass(class, selection, &mut chooser)?;

        let mut sources = vec![SourceGrants {
            kind: SourceKind::Background,
            traits: &background.traits,
            points: &background.options,
        }];
        sources.push(SourceGrants {
            kind: SourceKind::Race,
            traits: &race.traits,
            points: &race.options,
        });
        if let Some(sub) = subrace {
            sources.push(SourceGrants {
                kind: SourceKind::Race,
                traits: &sub.traits,
                points: &sub.options,
            });
        }
        sources.push(SourceGrants {
            kind: SourceKind::Class,
            traits: &class.traits,
            points: &class.options,
        });
        if let Some(sub) = subclass {
            sources.push(SourceGrants {
                kind: SourceKind::Class,
                traits: &sub.traits,
                points: &sub.options,
            });
        }

        let mut grants = self.collect_grants(&sources, selection, filter, &mut chooser);
        for ability in &class.saving_throws {
            if !grants.proficiencies.saving_throws.contains(ability) {
                grants.proficiencies.saving_throws.push(*ability);
            }
        }

        let mut equipment = resolve_equipment(&class.equipment, &filter.equipment, &mut chooser);
        for grant in &equipment {
            grants.record(SourceKind::Class, ChoiceCategory::Equipment, &grant.item);
        }
        equipment.append(&mut grants.equipment);
        for grant in &equipment {
            if self.repo.equipment(&grant.item).is_none() {
                return Err(ForgeError::not_found("Equipment", &grant.item));
            }
        }

        // Ability scores
        let main_ability = pick_main_ability(class, filter, &mut chooser)?;
        let second_ability = subclass
            .and_then(|s| s.second_ability)
            .unwrap_or(class.second_ability);
        let racial_bonuses = racial_bonuses(race, subrace, main_ability, second_ability);

        let ranges = Ability::ALL
            .into_iter()
            .map(|a| {
                let bonus = racial_bonuses.get(&a).copied().unwrap_or(0);
                (a, purchasable_range(filter.abilities.get(&a), bonus))
            })
            .collect();
        let base = point_buy(&priority_order(main_ability, second_ability), &ranges);
        let ability_scores: BTreeMap<Ability, i32> = base
            .into_iter()
            .map(|(a, score)| (a, score + racial_bonuses.get(&a).copied().unwrap_or(0)))
            .collect();
        let modifier = |a: Ability| Ability::modifier(ability_scores.get(&a).copied().unwrap_or(10));

        let armor_class = self.armor_class(&equipment, modifier(Ability::Dexterity))?;
        let con = modifier(Ability::Constitution);
        let level = self.level as i32;
        let hit_points = class.hit_die + con + (class.hit_die / 2 + 1 + con) * (level - 1);

        // Magic
        let casting_ability = if main_ability.is_spellcasting() {
            main_ability
        } else {
            second_ability
        };
        let mut spellcasting = Vec::new();
        if let Some(class_casting) = self.class_spellcasting(
            class,
            subclass,
            casting_ability,
            &grants.class_spells,
            &ability_scores,
            filter,
            &mut chooser,
        )? {
            for spell in &class_casting.known {
                grants.record(SourceKind::Class, ChoiceCategory::Spell, spell);
            }
            spellcasting.push(class_casting);
        }
        if !grants.racial_spells.is_empty() {
            for spell in &grants.racial_spells {
                if self.repo.spell(spell).is_none() {
                    return Err(ForgeError::not_found("Spell", spell));
                }
            }
            let ability = subrace
                .and_then(|s| s.spell_ability)
                .or(race.spell_ability)
                .unwrap_or(Ability::Charisma);
            match spellcasting.iter_mut().find(|s| s.ability == ability) {
                Some(existing) => {
                    for spell in &grants.racial_spells {
                        if !existing.known.contains(spell) {
                            existing.known.push(spell.clone());
                        }
                    }
                }
                None => {
                    let mut racial = Spellcasting::new(SourceKind::Race, ability);
                    racial.known = grants.racial_spells.clone();
                    spellcasting.push(racial);
                }
            }
        }

        let build = Build {
            level: self.level,
            race: race.name.clone(),
            subrace: subrace.map(|s| s.name.clone()),
            class: class.name.clone(),
            subclass: subclass.map(|s| s.name.clone()),
            background: background.name.clone(),
            size: race.size.clone(),
            speed: subrace.and_then(|s| s.speed).unwrap_or(race.speed),
            darkvision: subrace.and_then(|s| s.darkvision).unwrap_or(race.darkvision),
            hit_die: class.hit_die,
            main_ability,
            second_ability,
            racial_bonuses,
            armor_class,
            hit_points,
            proficiency_bonus: 2 + (level - 1) / 4,
            ability_scores,
            proficiencies: grants.proficiencies,
            languages: grants.languages,
            traits: grants.traits,
            equipment,
            spellcasting,
            grants: grants.sourced,
        };
        check_granted(&build, selection)?;
        Ok(build)
    }

    /// The resolved option for a kind, or a uniformly random one when nothing asked for it
    fn core_option<R: Rng>(
        &self,
        selection: &ResolvedSelection,
        kind: SourceKind,
        chooser: &mut Chooser<'_, R>,
    ) -> Result<String> {
        if let Some(option) = selection.option(kind) {
            return Ok(option.to_string());
        }
        self.repo
            .source_ids(kind)
            .choose(chooser.rng())
            .cloned()
            .ok_or_else(|| ForgeError::Content(format!("No {} options available", kind)))
    }

    fn pick_subrace<'r, R: Rng>(
        &self,
        race: &'r RaceDef,
        selection: &ResolvedSelection,
        chooser: &mut Chooser<'_, R>,
    ) -> Result<Option<&'r SubraceDef>> {
        if let Some(name) = selection.items(SourceKind::Race, ChoiceCategory::Subrace).first() {
            return race
                .subrace(name)
                .map(Some)
                .ok_or_else(|| ForgeError::not_found("Subrace", *name));
        }
        let requested = requested_items(selection, SourceKind::Race);
        Ok(chooser
            .best_by(&race.subraces, |sub| coverage(&sub.traits, &sub.options, &requested))
            .map(|idx| &race.subraces[idx]))
    }

    fn pick_subclass<'r, R: Rng>(
        &self,
        class: &'r ClassDef,
        selection: &ResolvedSelection,
        chooser: &mut Chooser<'_, R>,
    ) -> Result<Option<&'r SubclassDef>> {
        if let Some(name) = selection.items(SourceKind::Class, ChoiceCategory::Subclass).first() {
            let sub = class
                .subclass(name)
                .ok_or_else(|| ForgeError::not_found("Subclass", *name))?;
            if sub.required_level > self.level {
                return Err(ForgeError::InfeasibleSelection {
                    item: sub.name.clone(),
                    category: ChoiceCategory::Subclass.to_string(),
                    reason: format!("requires level {}", sub.required_level),
                });
            }
            return Ok(Some(sub));
        }
        let available: Vec<&SubclassDef> = class
            .subclasses
            .iter()
            .filter(|s| s.required_level <= self.level)
            .collect();
        let requested = requested_items(selection, SourceKind::Class);
        Ok(chooser
            .best_by(&available, |sub| coverage(&sub.traits, &sub.options, &requested))
            .map(|idx| available[idx]))
    }

    /// Fixed grants first so choice points can avoid handing out duplicates
    fn collect_grants<R: Rng>(
        &self,
        sources: &[SourceGrants<'_>],
        selection: &ResolvedSelection,
        filter: &Filter,
        chooser: &mut Chooser<'_, R>,
    ) -> Grants {
        let mut grants = Grants::default();

        for source in sources {
            for name in source.traits {
                if !grants.traits.contains(name) {
                    grants.traits.push(name.clone());
                }
            }
            for point in source
                .points
                .iter()
                .filter(|p| p.is_available(self.level) && p.is_fixed())
            {
                for option in &point.options {
                    grants.grant(source.kind, point, option);
                }
            }
        }

        let assigned = self.point_assignments(sources, selection);
        for (source_idx, source) in sources.iter().enumerate() {
            for (point_idx, point) in source.points.iter().enumerate() {
                if !point.is_available(self.level) || point.is_fixed() {
                    continue;
                }
                let mut preferred: Vec<&str> = assigned
                    .get(&(source_idx, point_idx))
                    .cloned()
                    .unwrap_or_default();
                preferred.extend(selection.items(source.kind, point.category));
                preferred.extend(filter_items(filter, point.category));
                let held = grants.held(point.category);
                for item in chooser.pick(&point.options, point.amount(), &preferred, &held) {
                    grants.grant(source.kind, point, &item);
                }
            }
        }

        grants
    }

    /// Resolved items matched onto the choice points of their source, keyed by
    /// (source index, point index). A source whose points cannot take all of
    /// its items gets no matching, and the grant check reports what is missing.
    fn point_assignments<'s>(
        &self,
        sources: &[SourceGrants<'_>],
        selection: &'s ResolvedSelection,
    ) -> HashMap<(usize, usize), Vec<&'s str>> {
        let mut assigned: HashMap<(usize, usize), Vec<&'s str>> = HashMap::new();
        for kind in SourceKind::ALL {
            for category in LIST_CATEGORIES {
                let items = selection.items(kind, category);
                if items.is_empty() {
                    continue;
                }
                let points: Vec<(usize, usize, &ChoicePoint)> = sources
                    .iter()
                    .enumerate()
                    .filter(|(_, source)| source.kind == kind)
                    .flat_map(|(source_idx, source)| {
                        source
                            .points
                            .iter()
                            .enumerate()
                            .map(move |(point_idx, point)| (source_idx, point_idx, point))
                    })
                    .filter(|(_, _, p)| p.category == category && p.is_available(self.level))
                    .collect();
                let slots: Vec<ChoiceSlot> = points.iter().map(|(_, _, p)| ChoiceSlot::from_point(p)).collect();
                let slot_refs: Vec<&ChoiceSlot> = slots.iter().collect();
                let Some(assignment) = assign_slots(&slot_refs, &items) else {
                    continue;
                };
                for (item, slot) in items.into_iter().zip(assignment) {
                    let (source_idx, point_idx, _) = points[slot];
                    assigned.entry((source_idx, point_idx)).or_default().push(item);
                }
            }
        }
        assigned
    }

    fn armor_class(&self, equipment: &[EquipmentGrant], dex_mod: i32) -> Result<i32> {
        let mut body: Option<i32> = None;
        let mut shields = 0;
        let mut seen: HashSet<&str> = HashSet::new();
        for grant in equipment {
            if !seen.insert(grant.item.as_str()) {
                continue;
            }
            let def = self
                .repo
                .equipment(&grant.item)
                .ok_or_else(|| ForgeError::not_found("Equipment", &grant.item))?;
            match def.armor_class {
                Some(ac) if ac.is_bonus() => shields += ac.value_with(dex_mod),
                Some(ac) => {
                    let value = ac.value_with(dex_mod);
                    body = Some(body.map_or(value, |b| b.max(value)));
                }
                None => {}
            }
        }
        Ok(body.unwrap_or(10 + dex_mod) + shields)
    }

    #[allow(clippy::too_many_arguments)]
    fn class_spellcasting<R: Rng>(
        &self,
        class: &ClassDef,
        subclass: Option<&SubclassDef>,
        ability: Ability,
        granted: &[String],
        scores: &BTreeMap<Ability, i32>,
        filter: &Filter,
        chooser: &mut Chooser<'_, R>,
    ) -> Result<Option<Spellcasting>> {
        let magics: Vec<&MagicDef> = class
            .magic
            .iter()
            .chain(subclass.and_then(|s| s.magic.as_ref()))
            .collect();
        if magics.is_empty() && granted.is_empty() {
            return Ok(None);
        }

        let preferred: Vec<&str> = filter.spells.iter().map(String::as_str).collect();
        let mut casting = Spellcasting::new(SourceKind::Class, ability);

        for magic in magics {
            let Some(progression) = magic.at_level(self.level) else {
                continue;
            };
            for (idx, &slots) in progression.spell_slots.iter().enumerate() {
                if casting.spell_slots.len() <= idx {
                    casting.spell_slots.push(0);
                }
                casting.spell_slots[idx] = casting.spell_slots[idx].max(slots);
            }

            let max_level = progression.max_spell_level();
            let mut cantrips = Vec::new();
            let mut leveled = Vec::new();
            for name in &magic.spell_list {
                let spell = self
                    .repo
                    .spell(name)
                    .ok_or_else(|| ForgeError::not_found("Spell", name))?;
                if spell.is_cantrip() {
                    cantrips.push(name.clone());
                } else if spell.level <= max_level {
                    leveled.push(name.clone());
                }
            }

            let held: HashSet<String> = casting.known.iter().cloned().collect();
            let known = chooser.pick(&cantrips, progression.cantrips_known, &preferred, &held);
            casting.known.extend(known);

            if magic.prepared {
                let prep_ability = magic.preparation_ability.unwrap_or(ability);
                let prep_mod = Ability::modifier(scores.get(&prep_ability).copied().unwrap_or(10));
                let budget = (prep_mod + self.level as i32).max(0) as usize;
                let held: HashSet<String> = casting.prepared.iter().cloned().collect();
                let prepared = chooser.pick(&leveled, budget, &preferred, &held);
                for option in leveled {
                    if !casting.prepared_options.contains(&option) {
                        casting.prepared_options.push(option);
                    }
                }
                casting.prepared_budget += budget;
                casting.prepared.extend(prepared);
            } else {
                let held: HashSet<String> = casting.known.iter().cloned().collect();
                let known = chooser.pick(&leveled, progression.spells_known, &preferred, &held);
                casting.known.extend(known);
            }
        }

        for spell in granted {
            if self.repo.spell(spell).is_none() {
                return Err(ForgeError::not_found("Spell", spell));
            }
            if !casting.known.contains(spell) {
                casting.known.push(spell.clone());
            }
        }

        Ok(Some(casting))
    }
}

/// Resolve every root of an equipment tree, preferring alternatives that hold requested items
pub fn resolve_equipment<R: Rng>(
    tree: &EquipmentTree,
    requested: &[String],
    chooser: &mut Chooser<'_, R>,
) -> Vec<EquipmentGrant> {
    let mut out = Vec::new();
    for root in tree.roots().collect::<Vec<_>>() {
        resolve_node(tree, root, requested, chooser, &mut out);
    }
    out
}

fn resolve_node<R: Rng>(
    tree: &EquipmentTree,
    id: NodeId,
    requested: &[String],
    chooser: &mut Chooser<'_, R>,
    out: &mut Vec<EquipmentGrant>,
) {
    let Some(node) = tree.node(id) else {
        return;
    };
    if node.has_choice {
        let alternatives = tree.alternatives(id);
        let picked = chooser.best_by(&alternatives, |alt| {
            tree.alternative_items(alt)
                .iter()
                .filter(|item| requested.iter().any(|r| r.as_str() == **item))
                .count()
        });
        match picked.map(|idx| &alternatives[idx]) {
            Some(Alternative::Item(grant)) => out.push((*grant).clone()),
            Some(Alternative::Bundle(child)) => resolve_node(tree, *child, requested, chooser, out),
            None => {}
        }
    } else {
        out.extend(node.items.iter().cloned());
        for child in tree.children(id).collect::<Vec<_>>() {
            resolve_node(tree, child, requested, chooser, out);
        }
    }
}

/// The class's main ability; a split class follows the higher requested minimum
fn pick_main_ability<R: Rng>(
    class: &ClassDef,
    filter: &Filter,
    chooser: &mut Chooser<'_, R>,
) -> Result<Ability> {
    let requested_min = |a: &Ability| {
        filter
            .abilities
            .get(a)
            .map_or(0, |r| r.min.max(0) as usize)
    };
    chooser
        .best_by(&class.main_abilities, requested_min)
        .map(|idx| class.main_abilities[idx])
        .ok_or_else(|| ForgeError::Content(format!("Class '{}' has no main ability", class.name)))
}

fn racial_bonuses(
    race: &RaceDef,
    subrace: Option<&SubraceDef>,
    main: Ability,
    second: Ability,
) -> BTreeMap<Ability, i32> {
    let mut bonuses = race.ability_bonuses.clone();
    if let Some(sub) = subrace {
        for (&ability, &bonus) in &sub.ability_bonuses {
            *bonuses.entry(ability).or_insert(0) += bonus;
        }
    }
    if let Some(flexible) = race.flexible_bonus {
        let target = if bonuses.get(&main).copied().unwrap_or(0) > 0 {
            second
        } else {
            main
        };
        *bonuses.entry(target).or_insert(0) += flexible;
    }
    bonuses
}

const LIST_CATEGORIES: [ChoiceCategory; 3] = [
    ChoiceCategory::Proficiency,
    ChoiceCategory::Language,
    ChoiceCategory::Spell,
];

/// Every non-core item the resolver placed must have made it into the build
fn check_granted(build: &Build, selection: &ResolvedSelection) -> Result<()> {
    for (kind, source) in &selection.sources {
        for resolved in &source.items {
            if resolved.category.is_core() || build.holds(resolved.category, &resolved.item) {
                continue;
            }
            return Err(ForgeError::InfeasibleSelection {
                item: resolved.item.clone(),
                category: resolved.category.to_string(),
                reason: format!("{} '{}' did not grant it", kind, source.option),
            });
        }
    }
    Ok(())
}

fn requested_items(selection: &ResolvedSelection, kind: SourceKind) -> Vec<&str> {
    selection
        .source(kind)
        .map(|s| s.items.iter().map(|i| i.item.as_str()).collect())
        .unwrap_or_default()
}

fn coverage(traits: &[String], points: &[ChoicePoint], requested: &[&str]) -> usize {
    requested
        .iter()
        .filter(|item| traits.iter().any(|t| t.as_str() == **item) || points.iter().any(|p| p.offers(item)))
        .count()
}

fn filter_items(filter: &Filter, category: ChoiceCategory) -> Vec<&str> {
    let lists: Vec<&Vec<String>> = match category {
        ChoiceCategory::Proficiency => vec![&filter.proficiencies, &filter.skills],
        ChoiceCategory::Language => vec![&filter.languages],
        ChoiceCategory::Spell => vec![&filter.spells],
        ChoiceCategory::Equipment => vec![&filter.equipment],
        _ => Vec::new(),
    };
    lists
        .into_iter()
        .flat_map(|l| l.iter().map(String::as_str))
        .collect()
}
