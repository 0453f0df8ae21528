use crate::types::{Ability, AbilityRange};
use std::collections::BTreeMap;

pub const POINT_BUY_BUDGET: i32 = 27;
pub const MIN_PURCHASE: i32 = 8;
pub const MAX_PURCHASE: i32 = 15;

/// Points spent to raise a score from 8
pub fn cost(score: i32) -> i32 {
    match score {
        i32::MIN..=8 => 0,
        9..=13 => score - 8,
        14..=15 => (score - 13) * 2 + 5,
        _ => 28,
    }
}

pub fn total_cost(scores: &BTreeMap<Ability, i32>) -> i32 {
    scores.values().map(|&s| cost(s)).sum()
}

/// Purchasable range for an ability once its racial bonus is taken off a final range
pub fn purchasable_range(final_range: Option<&AbilityRange>, racial_bonus: i32) -> AbilityRange {
    let (min, max) = match final_range {
        Some(range) => (range.min - racial_bonus, range.max - racial_bonus),
        None => (MIN_PURCHASE, MAX_PURCHASE),
    };
    let min = min.clamp(MIN_PURCHASE, MAX_PURCHASE);
    let max = max.clamp(MIN_PURCHASE, MAX_PURCHASE).max(min);
    AbilityRange::new(min, max)
}

/// Order in which abilities receive points: main, second, constitution, then the rest
pub fn priority_order(main: Ability, second: Ability) -> Vec<Ability> {
    let mut order = vec![main];
    for ability in [second, Ability::Constitution].into_iter().chain(Ability::ALL) {
        if !order.contains(&ability) {
            order.push(ability);
        }
    }
    order
}

/// Spend the point-buy budget over `priority`, honouring per-ability ranges.
///
/// Minimums are bought first; when they overspend, the lowest priority
/// abilities give points back. Scores above their maximum are refunded, and
/// whatever is left goes to the highest priority abilities one point at a
/// time while the next point is affordable.
pub fn point_buy(
    priority: &[Ability],
    ranges: &BTreeMap<Ability, AbilityRange>,
) -> BTreeMap<Ability, i32> {
    let full = AbilityRange::new(MIN_PURCHASE, MAX_PURCHASE);
    let range_of = |ability: Ability| ranges.get(&ability).copied().unwrap_or(full);

    let mut scores: BTreeMap<Ability, i32> = priority
        .iter()
        .map(|&a| (a, range_of(a).min.clamp(MIN_PURCHASE, MAX_PURCHASE)))
        .collect();
    let mut budget = POINT_BUY_BUDGET - total_cost(&scores);

    while budget < 0 {
        let Some(&ability) = priority
            .iter()
            .rev()
            .find(|a| scores.get(a).map_or(false, |&s| s > MIN_PURCHASE))
        else {
            break;
        };
        if let Some(score) = scores.get_mut(&ability) {
            budget += cost(*score) - cost(*score - 1);
            *score -= 1;
        }
    }

    for &ability in priority {
        let max = range_of(ability).max;
        if let Some(score) = scores.get_mut(&ability) {
            if *score > max {
                budget += cost(*score) - cost(max.max(MIN_PURCHASE));
                *score = max.max(MIN_PURCHASE);
            }
        }
    }

    for &ability in priority {
        let cap = range_of(ability).max.min(MAX_PURCHASE);
        if let Some(score) = scores.get_mut(&ability) {
            while *score < cap {
                let step = cost(*score + 1) - cost(*score);
                if step > budget {
                    break;
                }
                budget -= step;
                *score += 1;
            }
        }
    }

    scores
}
