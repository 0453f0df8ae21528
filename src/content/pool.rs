use super::model::ChoicePoint;

/// One choice point's share of a pool: the items it can hand out and how many
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSlot {
    pub options: Vec<String>,
    pub amount: usize,
}

impl ChoiceSlot {
    pub fn new(options: Vec<String>, amount: usize) -> Self {
        let amount = amount.min(options.len());
        Self { options, amount }
    }

    /// Every option is granted
    pub fn fixed(options: Vec<String>) -> Self {
        let amount = options.len();
        Self { options, amount }
    }

    pub fn from_point(point: &ChoicePoint) -> Self {
        Self::new(point.options.clone(), point.amount())
    }

    pub fn offers(&self, item: &str) -> bool {
        self.options.iter().any(|o| o == item)
    }
}

/// Legal items of one category a source offers, split into the choice points
/// that hand them out.
///
/// A source with variants (subraces, subclasses) takes exactly one of them, so
/// `variants` are alternatives stacked on top of the shared `slots`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionPool {
    pub options: Vec<String>,
    /// Most items any single layout can hand out
    pub capacity: usize,
    pub slots: Vec<ChoiceSlot>,
    pub variants: Vec<(String, Vec<ChoiceSlot>)>,
}

impl OptionPool {
    pub fn new(slots: Vec<ChoiceSlot>, variants: Vec<(String, Vec<ChoiceSlot>)>) -> Self {
        let mut options: Vec<String> = Vec::new();
        for slot in slots.iter().chain(variants.iter().flat_map(|(_, v)| v)) {
            for option in &slot.options {
                if !options.contains(option) {
                    options.push(option.clone());
                }
            }
        }
        let base: usize = slots.iter().map(|s| s.amount).sum();
        let extra = variants
            .iter()
            .map(|(_, v)| v.iter().map(|s| s.amount).sum::<usize>())
            .max()
            .unwrap_or(0);
        Self {
            options,
            capacity: base + extra,
            slots,
            variants,
        }
    }

    /// A pool handing out exactly one of `options`
    pub fn one_of(options: Vec<String>) -> Self {
        Self::new(vec![ChoiceSlot::new(options, 1)], Vec::new())
    }

    pub fn offers(&self, item: &str) -> bool {
        self.options.iter().any(|o| o == item)
    }

    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|(name, _)| name.as_str())
    }

    /// Keep only the named variant; a pool without variants is unchanged
    pub fn restrict_to(&mut self, variant: &str) {
        if self.variants.is_empty() {
            return;
        }
        let variants = std::mem::take(&mut self.variants)
            .into_iter()
            .filter(|(name, _)| name == variant)
            .collect();
        let slots = std::mem::take(&mut self.slots);
        *self = Self::new(slots, variants);
    }

    /// Slots of the layout taking `variant`, or the shared slots alone
    pub fn layout(&self, variant: Option<&str>) -> Vec<&ChoiceSlot> {
        let mut slots: Vec<&ChoiceSlot> = self.slots.iter().collect();
        if let Some(name) = variant {
            if let Some((_, extra)) = self.variants.iter().find(|(n, _)| n == name) {
                slots.extend(extra);
            }
        }
        slots
    }

    /// Whether some layout can hand out every one of `items` at once
    pub fn fits(&self, items: &[&str]) -> bool {
        if self.variants.is_empty() {
            return assign_slots(&self.layout(None), items).is_some();
        }
        self.variant_names()
            .any(|name| self.fits_variant(Some(name), items))
    }

    pub fn fits_variant(&self, variant: Option<&str>, items: &[&str]) -> bool {
        assign_slots(&self.layout(variant), items).is_some()
    }
}

/// The slot each item is handed out by, or `None` when the slots cannot cover
/// all of them. Bipartite matching of items onto slot units.
pub fn assign_slots(slots: &[&ChoiceSlot], items: &[&str]) -> Option<Vec<usize>> {
    let units: Vec<usize> = slots
        .iter()
        .enumerate()
        .flat_map(|(idx, slot)| std::iter::repeat(idx).take(slot.amount))
        .collect();
    if items.len() > units.len() {
        return None;
    }

    let mut owner: Vec<Option<usize>> = vec![None; units.len()];
    for item in 0..items.len() {
        let mut visited = vec![false; units.len()];
        if !augment(item, slots, &units, items, &mut owner, &mut visited) {
            return None;
        }
    }

    let mut assignment = vec![0; items.len()];
    for (unit, holder) in owner.iter().enumerate() {
        if let Some(item) = holder {
            assignment[*item] = units[unit];
        }
    }
    Some(assignment)
}

fn augment(
    item: usize,
    slots: &[&ChoiceSlot],
    units: &[usize],
    items: &[&str],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for unit in 0..units.len() {
        if visited[unit] || !slots[units[unit]].offers(items[item]) {
            continue;
        }
        visited[unit] = true;
        let free = match owner[unit] {
            None => true,
            Some(other) => augment(other, slots, units, items, owner, visited),
        };
        if free {
            owner[unit] = Some(item);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(options: &[&str], amount: usize) -> ChoiceSlot {
        ChoiceSlot::new(options.iter().map(|s| s.to_string()).collect(), amount)
    }

    #[test]
    fn test_items_reshuffle_to_fit() {
        let wide = slot(&["Arcana", "History"], 1);
        let narrow = slot(&["Arcana"], 1);
        let assignment = assign_slots(&[&wide, &narrow], &["Arcana", "History"]).unwrap();
        assert_eq!(assignment, vec![1, 0]);
    }

    #[test]
    fn test_fixed_slot_does_not_absorb_other_items() {
        let skills = slot(&["Athletics", "Survival", "Acrobatics"], 2);
        let armor = ChoiceSlot::fixed(vec!["Light Armor".into(), "Shields".into()]);
        let pool = OptionPool::new(vec![skills, armor], Vec::new());

        assert_eq!(pool.capacity, 4);
        assert!(pool.fits(&["Athletics", "Survival", "Shields"]));
        assert!(!pool.fits(&["Athletics", "Survival", "Acrobatics"]));
    }

    #[test]
    fn test_variants_are_alternatives() {
        let pool = OptionPool::new(
            vec![slot(&["Common"], 1)],
            vec![
                ("High Elf".to_string(), vec![slot(&["Giant"], 1)]),
                ("Wood Elf".to_string(), vec![slot(&["Sylvan"], 1)]),
            ],
        );
        assert_eq!(pool.capacity, 2);
        assert!(pool.fits(&["Common", "Giant"]));
        assert!(!pool.fits(&["Giant", "Sylvan"]));

        let mut wood = pool.clone();
        wood.restrict_to("Wood Elf");
        assert!(!wood.fits(&["Giant"]));
        assert!(wood.fits(&["Sylvan", "Common"]));
    }
}
