pub mod archetype;
pub mod evaluator;

pub use archetype::{ArchetypeSelection, ObjectiveWeights, ARCHETYPE_MULTIPLIERS};
pub use evaluator::{Fitness, FitnessEvaluator, TagFitness};
