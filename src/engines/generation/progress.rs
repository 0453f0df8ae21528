use serde::Serialize;
use std::sync::mpsc::Sender;

/// What one generation produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub population_size: usize,
    pub front_size: usize,
    /// Best value reached for each objective
    pub best_objectives: Vec<f64>,
    pub discarded: usize,
    pub duplicates_removed: usize,
}

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, summary: &GenerationSummary);
    fn on_individual_built(&mut self, built: usize, total: usize);
}

/// Ignores every event
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_generation_complete(&mut self, _summary: &GenerationSummary) {}
    fn on_individual_built(&mut self, _built: usize, _total: usize) {}
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation + 1);
    }

    fn on_generation_complete(&mut self, summary: &GenerationSummary) {
        log::info!(
            "Generation {} complete. Population: {}, front: {}, best health: {:.2}, discarded: {}, duplicates: {}",
            summary.generation + 1,
            summary.population_size,
            summary.front_size,
            summary.best_objectives.first().copied().unwrap_or(0.0),
            summary.discarded,
            summary.duplicates_removed
        );
    }

    fn on_individual_built(&mut self, built: usize, total: usize) {
        if built % 10 == 0 || built == total {
            log::debug!("  Built {}/{} individuals", built, total);
        }
    }
}

/// Forwards progress to another thread, e.g. a UI
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete(GenerationSummary),
    IndividualBuilt { current: usize, total: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, summary: &GenerationSummary) {
        let _ = self
            .sender
            .send(ProgressMessage::GenerationComplete(summary.clone()));
    }

    fn on_individual_built(&mut self, built: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::IndividualBuilt {
            current: built,
            total,
        });
    }
}
