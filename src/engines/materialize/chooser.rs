use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Picks options at a choice point: requested items first, then at random
pub struct Chooser<'r, R: Rng> {
    rng: &'r mut R,
}

impl<'r, R: Rng> Chooser<'r, R> {
    pub fn new(rng: &'r mut R) -> Self {
        Self { rng }
    }

    /// Choose `amount` of `options`, skipping anything in `held`.
    ///
    /// `preferred` items that the options offer are taken in order; the rest
    /// is drawn uniformly without replacement.
    pub fn pick(
        &mut self,
        options: &[String],
        amount: usize,
        preferred: &[&str],
        held: &HashSet<String>,
    ) -> Vec<String> {
        let mut picked: Vec<String> = Vec::new();

        for item in preferred {
            if picked.len() >= amount {
                return picked;
            }
            if held.contains(*item) || picked.iter().any(|p| p.as_str() == *item) {
                continue;
            }
            if options.iter().any(|o| o.as_str() == *item) {
                picked.push(item.to_string());
            }
        }

        let remaining: Vec<&String> = options
            .iter()
            .filter(|o| !held.contains(*o) && !picked.contains(*o))
            .collect();
        let missing = amount.saturating_sub(picked.len());
        picked.extend(
            remaining
                .choose_multiple(self.rng, missing)
                .map(|o| (*o).clone()),
        );
        picked
    }

    /// One option, preferring the first preferred item on offer
    pub fn pick_one<'a>(&mut self, options: &'a [String], preferred: &[&str]) -> Option<&'a String> {
        preferred
            .iter()
            .find_map(|p| options.iter().find(|o| o.as_str() == *p))
            .or_else(|| options.choose(self.rng))
    }

    /// Index of the best scoring candidate; ties are broken at random
    pub fn best_by<T>(&mut self, candidates: &[T], score: impl Fn(&T) -> usize) -> Option<usize> {
        let best = candidates.iter().map(&score).max()?;
        let tied: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| score(*c) == best)
            .map(|(idx, _)| idx)
            .collect();
        tied.choose(self.rng).copied()
    }

    pub fn rng(&mut self) -> &mut R {
        self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preferred_items_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut chooser = Chooser::new(&mut rng);
        let options = names(&["Arcana", "History", "Insight", "Religion"]);

        let picked = chooser.pick(&options, 2, &["Insight", "Stealth"], &HashSet::new());
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0], "Insight");
        assert_ne!(picked[1], "Insight");
    }

    #[test]
    fn test_held_items_skipped() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut chooser = Chooser::new(&mut rng);
        let options = names(&["Common", "Elvish", "Dwarvish"]);
        let held: HashSet<String> = names(&["Common", "Elvish"]).into_iter().collect();

        let picked = chooser.pick(&options, 2, &["Elvish"], &held);
        assert_eq!(picked, names(&["Dwarvish"]));
    }

    #[test]
    fn test_best_by_breaks_ties_within_best() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut chooser = Chooser::new(&mut rng);
        for _ in 0..20 {
            let idx = chooser.best_by(&[1usize, 3, 0, 3], |v| *v).unwrap();
            assert!(idx == 1 || idx == 3);
        }
        assert!(chooser.best_by::<usize>(&[], |v| *v).is_none());
    }
}
