use anyhow::{bail, Context};
use charforge::engines::generation::ConsoleProgressCallback;
use charforge::{Catalogue, ConfigManager, SearchEngine, SearchState};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct FrontEntry<'a> {
    filter: &'a charforge::Filter,
    objectives: &'a [f64],
    fitness: &'a charforge::Fitness,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(catalogue_path) = args.first() else {
        bail!("usage: charforge <catalogue.json> [config.toml]");
    };

    let catalogue = Catalogue::load(catalogue_path)
        .with_context(|| format!("loading content from {}", catalogue_path))?;
    catalogue.validate().context("validating content")?;

    let manager = ConfigManager::new();
    if let Some(config_path) = args.get(1) {
        manager
            .load_from_file(config_path)
            .with_context(|| format!("loading configuration from {}", config_path))?;
    }
    let config = manager.get()?;

    let state = SearchState::new(
        Arc::new(catalogue),
        config.search.clone(),
        &config.archetypes,
        config.locked.clone(),
    )
    .context("preparing search")?;
    let objective_names = state.weights.objective_names();

    let mut engine = SearchEngine::new(state)?;
    let outcome = engine.run(ConsoleProgressCallback).context("running search")?;

    let front: Vec<FrontEntry<'_>> = outcome
        .front
        .iter()
        .map(|individual| FrontEntry {
            filter: &individual.filter,
            objectives: &individual.objectives,
            fitness: &individual.fitness,
        })
        .collect();
    let report = serde_json::json!({
        "objectives": objective_names,
        "front": front,
        "stats": outcome.stats,
        "started_at": outcome.started_at,
        "finished_at": outcome.finished_at,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
