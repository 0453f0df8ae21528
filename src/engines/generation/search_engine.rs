use super::crossover::crossover;
use super::duplicates::eliminate_duplicates;
use super::individual::Individual;
use super::mutation::mutate;
use super::operators::{chance, pareto_tournament, task_seeds, OperatorReport};
use super::pareto::{
    fast_non_dominated_sort, rank_population, select_survivors, MultiObjectiveIndividual,
    OptimizationDirection,
};
use super::progress::{GenerationSummary, ProgressCallback};
use super::sampler::sample_one;
use super::state::{LockedFilters, SearchState};
use crate::config::FrontOrder;
use crate::error::{ForgeError, Result};
use crate::types::Filter;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Breeding rounds per generation spent replacing duplicate offspring
const MATING_ROUNDS: usize = 10;

/// Shared stop flag, honoured between generations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub generations_completed: usize,
    pub individuals_built: usize,
    /// Offspring thrown away, by cause
    pub discarded: BTreeMap<String, usize>,
    pub mutation_exhaustions: usize,
    pub crossover_fallbacks: usize,
    pub duplicates_removed: usize,
    pub cancelled: bool,
    pub timed_out: bool,
}

impl SearchStats {
    fn record(&mut self, report: &OperatorReport) {
        for (cause, count) in &report.discarded {
            *self.discarded.entry(cause.to_string()).or_insert(0) += count;
        }
        self.mutation_exhaustions += report.mutation_exhaustions;
        self.crossover_fallbacks += report.crossover_fallbacks;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Non-dominated individuals of the final population, ordered by health
    pub front: Vec<Individual>,
    pub population: Vec<Individual>,
    pub stats: SearchStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Crossover then mutation for one parent pair, on its own seeded RNG
fn reproduce(state: &SearchState, first: &Individual, second: &Individual, seed: u64) -> (Vec<Individual>, OperatorReport) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = OperatorReport::default();

    let (a, b) = if chance(state.config.crossover_rate, &mut rng) {
        crossover(state, first, second, &mut rng, &mut report)
    } else {
        (first.clone(), second.clone())
    };

    let children = [a, b]
        .into_iter()
        .map(|child| {
            if chance(state.config.mutation_rate, &mut rng) {
                mutate(state, &child, &mut rng, &mut report)
            } else {
                child
            }
        })
        .collect();

    (children, report)
}

pub struct SearchEngine {
    state: SearchState,
    rng: StdRng,
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
    stats: SearchStats,
    clock_start: Option<Instant>,
}

impl SearchEngine {
    pub fn new(state: SearchState) -> Result<Self> {
        let rng = match state.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let workers = state
            .config
            .workers
            .unwrap_or_else(rayon::current_num_threads)
            .min(state.config.population_size)
            .max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ForgeError::Search(format!("Failed to start worker pool: {}", e)))?;
        log::debug!("Search engine using {} worker threads", workers);

        Ok(Self {
            state,
            rng,
            pool,
            cancel: CancellationToken::default(),
            stats: SearchStats::default(),
            clock_start: None,
        })
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Replace the constraints every later individual must honour
    pub fn configure(&mut self, locked: Filter) {
        self.state.locked = LockedFilters::new(locked);
    }

    fn directions(&self) -> Vec<OptimizationDirection> {
        vec![OptimizationDirection::Minimize; self.state.objective_count()]
    }

    fn ranked(&self, population: &[Individual]) -> Vec<MultiObjectiveIndividual<usize>> {
        let mut ranked: Vec<_> = population
            .iter()
            .enumerate()
            .map(|(i, individual)| MultiObjectiveIndividual::new(i, individual.minimization_vector()))
            .collect();
        rank_population(&mut ranked, &self.directions());
        ranked
    }

    /// Up to `count` distinct random individuals under the locked filters.
    ///
    /// Fails when the locks themselves cannot be built.
    pub fn sample<C: ProgressCallback>(&mut self, count: usize, callback: &mut C) -> Result<Vec<Individual>> {
        let mut population: Vec<Individual> = Vec::with_capacity(count);

        for _ in 0..MATING_ROUNDS {
            let missing = count.saturating_sub(population.len());
            if missing == 0 {
                break;
            }
            let seeds = task_seeds(missing, &mut self.rng);
            let state = &self.state;
            let drawn: Vec<Result<Individual>> = self.pool.install(|| {
                seeds
                    .par_iter()
                    .map(|&seed| sample_one(state, &mut StdRng::seed_from_u64(seed)))
                    .collect()
            });
            let drawn = drawn.into_iter().collect::<Result<Vec<_>>>()?;
            self.stats.individuals_built += drawn.len();

            let (unique, removed) = eliminate_duplicates(drawn, &population);
            self.stats.duplicates_removed += removed;
            population.extend(unique);
            callback.on_individual_built(population.len(), count);
        }

        if population.len() < count {
            log::warn!(
                "Only {} distinct individuals could be sampled out of {}",
                population.len(),
                count
            );
        }
        Ok(population)
    }

    /// Evolve `population` for up to `generations` generations
    pub fn run_generations<C: ProgressCallback>(
        &mut self,
        mut population: Vec<Individual>,
        generations: usize,
        callback: &mut C,
    ) -> Result<Vec<Individual>> {
        if population.is_empty() {
            return Err(ForgeError::Search("Cannot evolve an empty population".to_string()));
        }
        let owns_clock = self.clock_start.is_none();
        let clock_start = *self.clock_start.get_or_insert_with(Instant::now);
        let limit = self.state.config.time_limit_secs.map(Duration::from_secs);

        for generation in 0..generations {
            if self.cancel.is_cancelled() {
                log::warn!("Search cancelled after {} generations", generation);
                self.stats.cancelled = true;
                break;
            }
            if limit.map_or(false, |limit| clock_start.elapsed() >= limit) {
                log::warn!("Search time limit reached after {} generations", generation);
                self.stats.timed_out = true;
                break;
            }

            callback.on_generation_start(generation);
            let (next, summary) = self.step(population, generation, callback);
            population = next;
            self.stats.generations_completed += 1;
            callback.on_generation_complete(&summary);
        }

        if owns_clock {
            self.clock_start = None;
        }
        Ok(population)
    }

    fn step<C: ProgressCallback>(
        &mut self,
        population: Vec<Individual>,
        generation: usize,
        callback: &mut C,
    ) -> (Vec<Individual>, GenerationSummary) {
        let size = self.state.config.population_size;
        let tournament_size = self.state.config.tournament_size;
        let ranked = self.ranked(&population);

        let mut offspring: Vec<Individual> = Vec::with_capacity(size);
        let mut report = OperatorReport::default();
        let mut duplicates = 0;

        for _ in 0..MATING_ROUNDS {
            let missing = size.saturating_sub(offspring.len());
            if missing == 0 {
                break;
            }
            let matings: Vec<(usize, usize, u64)> = (0..(missing + 1) / 2)
                .map(|_| {
                    let a = pareto_tournament(&ranked, tournament_size, &mut self.rng);
                    let b = pareto_tournament(&ranked, tournament_size, &mut self.rng);
                    (a, b, self.rng.gen())
                })
                .collect();

            let state = &self.state;
            let parents = &population;
            let bred: Vec<(Vec<Individual>, OperatorReport)> = self.pool.install(|| {
                matings
                    .par_iter()
                    .map(|&(a, b, seed)| reproduce(state, &parents[a], &parents[b], seed))
                    .collect()
            });

            let mut children = Vec::with_capacity(missing + 1);
            for (kids, kid_report) in bred {
                children.extend(kids);
                report.absorb(kid_report);
            }
            self.stats.individuals_built += children.len();

            let (children, against_population) = eliminate_duplicates(children, &population);
            let (children, against_offspring) = eliminate_duplicates(children, &offspring);
            duplicates += against_population + against_offspring;
            offspring.extend(children);
            offspring.truncate(size);
            callback.on_individual_built(offspring.len(), size);
        }

        self.stats.duplicates_removed += duplicates;
        self.stats.record(&report);
        if report.discarded_total() > 0 {
            log::warn!(
                "Generation {}: discarded {} offspring ({:?})",
                generation + 1,
                report.discarded_total(),
                report.discarded
            );
        }

        let mut merged = population;
        merged.extend(offspring);
        let next = self.survivors(merged, size);

        let summary = GenerationSummary {
            generation,
            population_size: next.len(),
            front_size: self.pareto_front(&next).len(),
            best_objectives: best_objectives(&next, self.state.objective_count()),
            discarded: report.discarded_total(),
            duplicates_removed: duplicates,
        };
        (next, summary)
    }

    /// Fill by fronts, cutting the last admitted front by crowding distance
    fn survivors(&self, merged: Vec<Individual>, size: usize) -> Vec<Individual> {
        let mut ranked: Vec<_> = merged
            .iter()
            .enumerate()
            .map(|(i, individual)| MultiObjectiveIndividual::new(i, individual.minimization_vector()))
            .collect();
        let keep = select_survivors(&mut ranked, &self.directions(), size);

        let mut slots: Vec<Option<Individual>> = merged.into_iter().map(Some).collect();
        keep.into_iter().filter_map(|i| slots[i].take()).collect()
    }

    /// Non-dominated members of `population`, ordered by health
    pub fn pareto_front(&self, population: &[Individual]) -> Vec<Individual> {
        let mut ranked: Vec<_> = population
            .iter()
            .enumerate()
            .map(|(i, individual)| MultiObjectiveIndividual::new(i, individual.minimization_vector()))
            .collect();
        let fronts = fast_non_dominated_sort(&mut ranked, &self.directions());

        let mut front: Vec<Individual> = fronts
            .first()
            .map(|first| first.iter().map(|&i| population[i].clone()).collect())
            .unwrap_or_default();
        front.sort_by(|a, b| {
            a.health()
                .partial_cmp(&b.health())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if self.state.config.front_order == FrontOrder::Descending {
            front.reverse();
        }
        front
    }

    /// Sample a population, evolve it and return the final front
    pub fn run<C: ProgressCallback>(&mut self, mut callback: C) -> Result<SearchOutcome> {
        let started_at = Utc::now();
        self.stats = SearchStats::default();
        self.clock_start = Some(Instant::now());

        let config = &self.state.config;
        let (size, generations) = (config.population_size, config.generations);
        log::info!(
            "Starting search: population {}, generations {}, objectives {:?}",
            size,
            generations,
            self.state.weights.objective_names()
        );

        let result = self
            .sample(size, &mut callback)
            .and_then(|population| self.run_generations(population, generations, &mut callback));
        self.clock_start = None;
        let population = result?;

        let front = self.pareto_front(&population);
        let finished_at = Utc::now();
        log::info!(
            "Search finished after {} generations with {} individuals on the front",
            self.stats.generations_completed,
            front.len()
        );

        Ok(SearchOutcome {
            front,
            population,
            stats: self.stats.clone(),
            started_at,
            finished_at,
        })
    }
}

fn best_objectives(population: &[Individual], count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            population
                .iter()
                .filter_map(|individual| individual.objectives.get(i).copied())
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .map(|best| if best.is_finite() { best } else { 0.0 })
        .collect()
}
