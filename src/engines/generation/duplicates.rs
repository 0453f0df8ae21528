use super::individual::Individual;

/// Same objectives, same per-tag breakdown, same health and magic pairs
pub fn is_duplicate(a: &Individual, b: &Individual) -> bool {
    a.objectives == b.objectives
        && a.fitness.tags == b.fitness.tags
        && a.fitness.health == b.fitness.health
        && a.fitness.magic == b.fitness.magic
}

/// Drop offspring that repeat a member of `population` or an earlier offspring.
/// Returns the survivors and how many were removed.
pub fn eliminate_duplicates(offspring: Vec<Individual>, population: &[Individual]) -> (Vec<Individual>, usize) {
    let total = offspring.len();
    let mut unique: Vec<Individual> = Vec::with_capacity(total);

    for candidate in offspring {
        let seen = population
            .iter()
            .chain(unique.iter())
            .any(|existing| is_duplicate(existing, &candidate));
        if !seen {
            unique.push(candidate);
        }
    }

    let removed = total - unique.len();
    (unique, removed)
}
