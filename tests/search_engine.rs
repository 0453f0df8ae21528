use charforge::config::{LocusWeights, SearchConfig};
use charforge::content::CatalogueData;
use charforge::engines::generation::{
    crossover, dominates, eliminate_duplicates, is_duplicate, merge_parents, mutate, sample,
    ChannelProgressCallback, Donors, Individual, OperatorReport, OptimizationDirection, ProgressMessage,
    SilentProgress,
};
use charforge::{
    Ability, AbilityRange, ArchetypeSelection, Catalogue, ChoiceCategory, Filter, FilterKey, ForgeError,
    SearchEngine, SearchState, SourceKind,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::mpsc;
use std::sync::Arc;

fn catalogue() -> Arc<Catalogue> {
    Arc::new(Catalogue::from_json(include_str!("fixtures/catalogue.json")).expect("fixture parses"))
}

fn test_config(seed: u64) -> SearchConfig {
    SearchConfig {
        population_size: 8,
        generations: 3,
        seed: Some(seed),
        workers: Some(2),
        ..SearchConfig::default()
    }
}

fn search_state(config: SearchConfig, locked: Filter) -> SearchState {
    SearchState::new(
        catalogue(),
        config,
        &ArchetypeSelection::pair("Tank", "Blaster"),
        locked,
    )
    .expect("state builds")
}

fn realize(state: &SearchState, filter: Filter, seed: u64) -> Individual {
    state
        .realize(&filter, &mut StdRng::seed_from_u64(seed))
        .expect("filter realizes")
}

fn locked_elf() -> Filter {
    Filter::default()
        .with_race("Elf")
        .with_item(FilterKey::Skills, "Stealth")
        .with_ability(Ability::Dexterity, AbilityRange::new(14, 17))
}

#[test]
fn test_crossover_child_takes_one_race_whole() {
    let state = search_state(test_config(1), Filter::default());
    let elf = realize(&state, Filter::default().with_race("Elf").with_class("Wizard"), 1);
    let dwarf = realize(&state, Filter::default().with_race("Dwarf").with_class("Fighter"), 2);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let mut report = OperatorReport::default();
        let (a, b) = crossover(&state, &elf, &dwarf, &mut rng, &mut report);
        for child in [a, b] {
            let donor = match child.build.race.as_str() {
                "Elf" => &elf,
                "Dwarf" => &dwarf,
                other => panic!("child race {} came from neither parent", other),
            };
            assert_eq!(child.build.subrace, donor.build.subrace);
            assert_eq!(child.build.ability_scores, donor.build.ability_scores);
        }
    }
}

#[test]
fn test_children_mix_race_and_class_with_their_grants() {
    let state = search_state(test_config(12), Filter::default());
    let rogue = realize(
        &state,
        Filter::default()
            .with_race("Half-Elf")
            .with_class("Rogue")
            .with_background("Criminal"),
        12,
    );
    let wizard = realize(
        &state,
        Filter::default()
            .with_race("Dwarf")
            .with_class("Wizard")
            .with_background("Sage"),
        13,
    );

    let donors = Donors {
        race: 0,
        class: 1,
        background: 0,
    };
    let genotype = merge_parents(&state, [&rogue, &wizard], donors);
    assert_eq!(genotype.race.as_deref(), Some("Half-Elf"));
    assert_eq!(genotype.class.as_deref(), Some("Wizard"));
    for item in rogue.build.granted_by(SourceKind::Race, ChoiceCategory::Proficiency) {
        assert!(genotype.skills.iter().chain(&genotype.proficiencies).any(|s| s == item));
    }
    for spell in wizard.build.granted_by(SourceKind::Class, ChoiceCategory::Spell) {
        assert!(genotype.spells.iter().any(|s| s == spell));
    }
    // The rogue's class picks stay behind with the rogue
    assert!(!genotype.proficiencies.iter().any(|p| p == "Rapiers"));

    let child = state
        .realize(&genotype, &mut StdRng::seed_from_u64(14))
        .expect("mixed child builds");
    assert_eq!(child.build.race, "Half-Elf");
    assert_eq!(child.build.class, "Wizard");

    let mut rng = StdRng::seed_from_u64(15);
    let mut mixed = false;
    for _ in 0..50 {
        let mut report = OperatorReport::default();
        let (a, b) = crossover(&state, &rogue, &wizard, &mut rng, &mut report);
        mixed |= [a, b].iter().any(|c| {
            (c.build.race == "Half-Elf" && c.build.class == "Wizard")
                || (c.build.race == "Dwarf" && c.build.class == "Rogue")
        });
    }
    assert!(mixed);
}

#[test]
fn test_locked_filters_survive_every_operator() {
    let state = search_state(test_config(2), locked_elf());
    let mut rng = StdRng::seed_from_u64(11);
    let population = sample(&state, 6, &mut rng).unwrap();

    let mut produced: Vec<Individual> = population.clone();
    let mut report = OperatorReport::default();
    for pair in population.chunks(2) {
        let (a, b) = crossover(&state, &pair[0], &pair[1], &mut rng, &mut report);
        produced.push(a);
        produced.push(b);
    }
    for individual in &population {
        for _ in 0..10 {
            produced.push(mutate(&state, individual, &mut rng, &mut report));
        }
    }

    for individual in &produced {
        assert_eq!(state.locked.violation(&individual.filter), None);
        assert_eq!(individual.build.race, "Elf");
        assert!(individual.build.proficiencies.skills.contains(&"Stealth".to_string()));
        assert!(individual.build.score(Ability::Dexterity) >= 14);
    }
}

#[test]
fn test_mutation_changes_something_eventually() {
    let state = search_state(test_config(3), Filter::default());
    let parent = realize(&state, Filter::default().with_race("Human").with_class("Fighter"), 3);
    let mut rng = StdRng::seed_from_u64(3);
    let mut report = OperatorReport::default();

    let changed = (0..20).any(|_| mutate(&state, &parent, &mut rng, &mut report).filter != parent.filter);
    assert!(changed);
}

#[test]
fn test_front_is_non_dominated() {
    let mut engine = SearchEngine::new(search_state(test_config(4), Filter::default())).unwrap();
    let outcome = engine.run(SilentProgress).unwrap();

    assert!(!outcome.front.is_empty());
    assert!(outcome.population.len() <= 8);
    let directions = vec![OptimizationDirection::Maximize; engine.state().objective_count()];
    for a in &outcome.front {
        for b in &outcome.front {
            assert!(!dominates(&b.objectives, &a.objectives, &directions));
        }
    }
    let healths: Vec<f64> = outcome.front.iter().map(|i| i.health()).collect();
    assert!(healths.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(outcome.stats.generations_completed, 3);
    assert!(outcome.finished_at >= outcome.started_at);
}

#[test]
fn test_duplicate_filter_only_matches_equal_fitness() {
    let state = search_state(test_config(5), Filter::default());
    let wizard = realize(&state, Filter::default().with_race("Elf").with_class("Wizard"), 5);
    let fighter = realize(&state, Filter::default().with_race("Dwarf").with_class("Fighter"), 5);

    assert!(is_duplicate(&wizard, &wizard.clone()));
    assert_ne!(wizard.objectives, fighter.objectives);
    assert!(!is_duplicate(&wizard, &fighter));

    let (unique, removed) = eliminate_duplicates(vec![wizard.clone(), fighter.clone(), wizard.clone()], &[]);
    assert_eq!(unique.len(), 2);
    assert_eq!(removed, 1);

    let (unique, removed) = eliminate_duplicates(vec![fighter.clone()], &[fighter]);
    assert!(unique.is_empty());
    assert_eq!(removed, 1);
}

#[test]
fn test_seeded_runs_repeat() {
    let run = || {
        let mut engine = SearchEngine::new(search_state(test_config(42), Filter::default())).unwrap();
        engine.run(SilentProgress).unwrap()
    };
    let first = run();
    let second = run();

    let filters = |outcome: &charforge::SearchOutcome| -> Vec<(Filter, Vec<f64>)> {
        outcome
            .population
            .iter()
            .map(|i| (i.filter.clone(), i.objectives.clone()))
            .collect()
    };
    assert_eq!(filters(&first), filters(&second));
}

#[test]
fn test_cancelled_run_returns_sampled_front() {
    let mut engine = SearchEngine::new(search_state(test_config(6), Filter::default())).unwrap();
    engine.cancellation_token().cancel();

    let outcome = engine.run(SilentProgress).unwrap();
    assert!(outcome.stats.cancelled);
    assert_eq!(outcome.stats.generations_completed, 0);
    assert!(!outcome.front.is_empty());
}

#[test]
fn test_zero_time_limit_stops_before_first_generation() {
    let config = SearchConfig {
        time_limit_secs: Some(0),
        ..test_config(7)
    };
    let mut engine = SearchEngine::new(search_state(config, Filter::default())).unwrap();
    let outcome = engine.run(SilentProgress).unwrap();
    assert!(outcome.stats.timed_out);
    assert_eq!(outcome.stats.generations_completed, 0);
}

#[test]
fn test_progress_is_sent_over_channel() {
    let (sender, receiver) = mpsc::channel();
    let mut engine = SearchEngine::new(search_state(test_config(8), Filter::default())).unwrap();
    engine.run(ChannelProgressCallback::new(sender)).unwrap();

    let messages: Vec<ProgressMessage> = receiver.try_iter().collect();
    assert!(messages.contains(&ProgressMessage::GenerationStart(0)));
    let completed = messages
        .iter()
        .filter(|m| matches!(m, ProgressMessage::GenerationComplete(_)))
        .count();
    assert_eq!(completed, 3);
}

#[test]
fn test_impossible_locks_abort_the_run() {
    let missing = search_state(test_config(9), Filter::default().with_race("Orc"));
    let mut engine = SearchEngine::new(missing).unwrap();
    assert!(matches!(
        engine.run(SilentProgress),
        Err(ForgeError::LockedFiltersUnsatisfiable(_))
    ));

    let clash = Filter::default().with_race("Dwarf").with_subrace("High Elf");
    let mut engine = SearchEngine::new(search_state(test_config(9), clash)).unwrap();
    assert!(matches!(
        engine.run(SilentProgress),
        Err(ForgeError::LockedFiltersUnsatisfiable(_))
    ));
}

#[test]
fn test_configure_replaces_locks() {
    let mut engine = SearchEngine::new(search_state(test_config(10), Filter::default())).unwrap();
    engine.configure(Filter::default().with_class("Wizard"));

    let outcome = engine.run(SilentProgress).unwrap();
    assert!(outcome.population.iter().all(|i| i.build.class == "Wizard"));
}

#[test]
fn test_missing_content_discards_offspring_but_finishes() {
    let mut data: CatalogueData =
        serde_json::from_str(include_str!("fixtures/catalogue.json")).expect("fixture parses");
    data.equipment.retain(|item| item.name != "Spellbook");
    let broken = Arc::new(Catalogue::from(data));

    let config = SearchConfig {
        generations: 4,
        mutation_rate: 1.0,
        sub_locus_probability: 0.0,
        locus_weights: LocusWeights {
            race: 0.0,
            class: 1.0,
            background: 0.0,
            languages: 0.0,
            proficiencies: 0.0,
            spells: 0.0,
            equipment: 0.0,
            skills: 0.0,
        },
        ..test_config(13)
    };
    let state = SearchState::new(broken, config, &ArchetypeSelection::pair("Tank", "Blaster"), Filter::default())
        .expect("state builds");
    let mut engine = SearchEngine::new(state).unwrap();

    let outcome = engine.run(SilentProgress).expect("run completes");
    assert_eq!(outcome.stats.generations_completed, 4);
    assert!(outcome.stats.discarded.get("content_not_found").copied().unwrap_or(0) > 0);
    assert!(outcome.population.iter().all(|i| i.build.class != "Wizard"));
}
