use charforge::engines::resolution::{
    requirements_from_filter, resolve, ChoiceRequirement, PoolCapacities, PoolKey, RequirementSet,
};
use charforge::{Catalogue, ChoiceCategory, Filter, FilterKey, ForgeError, SourceKind};
use proptest::prelude::*;
use std::collections::HashMap;

fn catalogue() -> Catalogue {
    Catalogue::from_json(include_str!("fixtures/catalogue.json")).expect("fixture parses")
}

#[test]
fn test_shared_pool_is_reused_instead_of_split() {
    let background = PoolKey::new(SourceKind::Background, "Background");
    let class = PoolKey::new(SourceKind::Class, "ClassOptions");
    let race = PoolKey::new(SourceKind::Race, "RaceOptions");

    let set = RequirementSet {
        requirements: vec![
            ChoiceRequirement::new(
                "Acrobatics",
                ChoiceCategory::Proficiency,
                vec![background.clone(), class.clone()],
            ),
            ChoiceRequirement::new(
                "Survival",
                ChoiceCategory::Proficiency,
                vec![background.clone(), class.clone(), race.clone()],
            ),
        ],
        capacities: PoolCapacities::default()
            .with(background.clone(), ChoiceCategory::Proficiency, 2)
            .with(class, ChoiceCategory::Proficiency, 2)
            .with(race, ChoiceCategory::Proficiency, 2),
    };

    let resolved = resolve(&set).unwrap();
    assert_eq!(resolved.pool_of(ChoiceCategory::Proficiency, "Acrobatics"), Some(background.clone()));
    assert_eq!(resolved.pool_of(ChoiceCategory::Proficiency, "Survival"), Some(background));
    assert_eq!(resolved.sources.len(), 1);
}

#[test]
fn test_catalogue_skills_land_in_one_background() {
    let repo = catalogue();
    let filter = Filter::default()
        .with_item(FilterKey::Skills, "Athletics")
        .with_item(FilterKey::Skills, "Survival");

    let set = requirements_from_filter(&repo, &filter, 1).unwrap();
    let resolved = resolve(&set).unwrap();

    assert_eq!(resolved.option(SourceKind::Background), Some("Outlander"));
    assert_eq!(
        resolved.items(SourceKind::Background, ChoiceCategory::Proficiency),
        vec!["Survival", "Athletics"]
    );
}

#[test]
fn test_unoffered_item_is_infeasible() {
    let repo = catalogue();
    let filter = Filter::default().with_item(FilterKey::Languages, "Sylvan");

    let set = requirements_from_filter(&repo, &filter, 1).unwrap();
    match resolve(&set) {
        Err(ForgeError::InfeasibleSelection { item, .. }) => assert_eq!(item, "Sylvan"),
        other => panic!("expected an infeasible selection, got {:?}", other),
    }
}

#[test]
fn test_unknown_race_is_a_lookup_error() {
    let repo = catalogue();
    let filter = Filter::default().with_race("Orc");
    assert!(matches!(
        requirements_from_filter(&repo, &filter, 1),
        Err(ForgeError::ContentNotFound { .. })
    ));
}

#[test]
fn test_fixed_background_skills_leave_class_picks_alone() {
    let repo = catalogue();
    let fighter = Filter::default()
        .with_class("Fighter")
        .with_background("Acolyte")
        .with_item(FilterKey::Skills, "Athletics")
        .with_item(FilterKey::Skills, "Survival");

    let set = requirements_from_filter(&repo, &fighter, 1).unwrap();
    let resolved = resolve(&set).unwrap();
    let mut picked = resolved.items(SourceKind::Class, ChoiceCategory::Proficiency);
    picked.sort();
    assert_eq!(picked, vec!["Athletics", "Survival"]);

    let greedy = fighter.with_item(FilterKey::Skills, "Acrobatics");
    let set = requirements_from_filter(&repo, &greedy, 1).unwrap();
    assert!(matches!(
        resolve(&set),
        Err(ForgeError::InfeasibleSelection { .. })
    ));
}

const SKILLS: [&str; 10] = [
    "Acrobatics",
    "Athletics",
    "Deception",
    "Insight",
    "Intimidation",
    "Perception",
    "Persuasion",
    "Stealth",
    "Survival",
    "History",
];
const LANGUAGES: [&str; 5] = ["Common", "Elvish", "Dwarvish", "Giant", "Infernal"];

proptest! {
    #[test]
    fn prop_every_item_resolved_exactly_once(
        skills in proptest::sample::subsequence(SKILLS.to_vec(), 0..5),
        languages in proptest::sample::subsequence(LANGUAGES.to_vec(), 0..3),
    ) {
        let repo = catalogue();
        let filter = skills
            .iter()
            .fold(Filter::default(), |f, s| f.with_item(FilterKey::Skills, s));
        let filter = languages
            .iter()
            .fold(filter, |f, l| f.with_item(FilterKey::Languages, l));

        let set = requirements_from_filter(&repo, &filter, 1).unwrap();
        match resolve(&set) {
            Ok(resolved) => {
                let mut seen: HashMap<String, usize> = HashMap::new();
                for source in resolved.sources.values() {
                    for item in &source.items {
                        *seen.entry(item.item.clone()).or_insert(0) += 1;
                    }
                }
                for requested in skills.iter().chain(&languages) {
                    prop_assert_eq!(seen.get(*requested).copied(), Some(1));
                }
                prop_assert_eq!(resolved.item_count(), skills.len() + languages.len());
            }
            Err(error) => {
                prop_assert!(
                    matches!(error, ForgeError::InfeasibleSelection { .. }),
                    "unexpected error {}",
                    error
                );
            }
        }
    }
}
