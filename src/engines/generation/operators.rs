use super::pareto::{crowded_comparison, MultiObjectiveIndividual};
use crate::error::ForgeError;
use crate::types::{ChoiceCategory, FilterKey};
use rand::Rng;
use std::collections::BTreeMap;

/// Filter lists holding the grants of each choice category
pub(crate) const GRANT_LISTS: [(ChoiceCategory, &[FilterKey]); 4] = [
    (
        ChoiceCategory::Proficiency,
        &[FilterKey::Proficiencies, FilterKey::Skills],
    ),
    (ChoiceCategory::Language, &[FilterKey::Languages]),
    (ChoiceCategory::Spell, &[FilterKey::Spells]),
    (ChoiceCategory::Equipment, &[FilterKey::Equipment]),
];

/// What the reproduction operators gave up on, tallied per generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorReport {
    pub discarded: BTreeMap<&'static str, usize>,
    pub crossover_fallbacks: usize,
    pub mutation_exhaustions: usize,
}

impl OperatorReport {
    pub fn discard(&mut self, error: &ForgeError) {
        log::debug!("Discarded offspring: {}", error);
        *self.discarded.entry(error.cause_label()).or_insert(0) += 1;
    }

    pub fn discarded_total(&self) -> usize {
        self.discarded.values().sum()
    }

    pub fn absorb(&mut self, other: OperatorReport) {
        for (cause, count) in other.discarded {
            *self.discarded.entry(cause).or_insert(0) += count;
        }
        self.crossover_fallbacks += other.crossover_fallbacks;
        self.mutation_exhaustions += other.mutation_exhaustions;
    }
}

/// Tournament on (rank, crowding distance); returns the winner's payload
pub fn pareto_tournament<T: Copy, R: Rng>(
    ranked: &[MultiObjectiveIndividual<T>],
    tournament_size: usize,
    rng: &mut R,
) -> T {
    let mut best = &ranked[rng.gen_range(0..ranked.len())];

    for _ in 1..tournament_size {
        let challenger = &ranked[rng.gen_range(0..ranked.len())];
        if crowded_comparison(challenger, best) {
            best = challenger;
        }
    }

    best.data
}

/// Bernoulli draw
pub fn chance<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> bool {
    rate > 0.0 && rng.gen::<f64>() < rate
}

/// One seed per parallel task, drawn in order so seeded runs repeat
pub fn task_seeds<R: Rng>(count: usize, rng: &mut R) -> Vec<u64> {
    (0..count).map(|_| rng.gen()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tournament_prefers_lower_rank() {
        let mut ranked = vec![
            MultiObjectiveIndividual::new(0usize, vec![]),
            MultiObjectiveIndividual::new(1usize, vec![]),
        ];
        ranked[0].rank = 1;
        ranked[1].rank = 0;

        let mut rng = StdRng::seed_from_u64(3);
        let mut wins = [0usize; 2];
        for _ in 0..200 {
            wins[pareto_tournament(&ranked, 2, &mut rng)] += 1;
        }
        assert!(wins[1] > wins[0]);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!(0..100).any(|_| chance(0.0, &mut rng)));
        assert!((0..100).all(|_| chance(1.0, &mut rng)));
    }

    #[test]
    fn test_report_tallies_by_cause() {
        let mut report = OperatorReport::default();
        report.discard(&ForgeError::not_found("Race", "Orc"));
        report.discard(&ForgeError::not_found("Class", "Bard"));

        let mut total = OperatorReport {
            mutation_exhaustions: 1,
            ..OperatorReport::default()
        };
        total.absorb(report);
        assert_eq!(total.discarded["content_not_found"], 2);
        assert_eq!(total.discarded_total(), 2);
        assert_eq!(total.mutation_exhaustions, 1);
    }

    #[test]
    fn test_task_seeds_are_reproducible() {
        let a = task_seeds(4, &mut StdRng::seed_from_u64(9));
        let b = task_seeds(4, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
