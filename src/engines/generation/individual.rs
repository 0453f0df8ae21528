use crate::engines::fitness::Fitness;
use crate::engines::materialize::Build;
use crate::types::Filter;
use serde::Serialize;

/// A realized genotype with its build and score
#[derive(Debug, Clone, Serialize)]
pub struct Individual {
    pub filter: Filter,
    pub build: Build,
    pub fitness: Fitness,
    /// Maximised objective vector, padded to the run's objective count
    pub objectives: Vec<f64>,
}

impl Individual {
    pub fn new(build: Build, fitness: Fitness, objective_count: usize) -> Self {
        let objectives = fitness.objectives(objective_count);
        Self {
            filter: build.to_filter(),
            build,
            fitness,
            objectives,
        }
    }

    /// Objectives negated for the minimising sort
    pub fn minimization_vector(&self) -> Vec<f64> {
        self.objectives.iter().map(|v| -v).collect()
    }

    pub fn health(&self) -> f64 {
        self.objectives.first().copied().unwrap_or(0.0)
    }
}
