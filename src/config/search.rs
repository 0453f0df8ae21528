use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::ForgeError;
use serde::{Deserialize, Serialize};

/// Order of the returned front by its health objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontOrder {
    #[default]
    Ascending,
    Descending,
}

/// Relative weight of each mutation locus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocusWeights {
    pub race: f64,
    pub class: f64,
    pub background: f64,
    pub languages: f64,
    pub proficiencies: f64,
    pub spells: f64,
    pub equipment: f64,
    pub skills: f64,
}

impl Default for LocusWeights {
    fn default() -> Self {
        Self {
            race: 1.0,
            class: 1.0,
            background: 1.0,
            languages: 1.0,
            proficiencies: 1.0,
            spells: 1.0,
            equipment: 1.0,
            skills: 1.0,
        }
    }
}

impl LocusWeights {
    pub fn values(&self) -> [f64; 8] {
        [
            self.race,
            self.class,
            self.background,
            self.languages,
            self.proficiencies,
            self.spells,
            self.equipment,
            self.skills,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub population_size: usize,
    pub generations: usize,
    pub crossover_rate: f64,
    /// Probability that an offspring is mutated at all
    pub mutation_rate: f64,
    pub mutation_retries: usize,
    pub crossover_retries: usize,
    pub sampling_attempts: usize,
    pub tournament_size: usize,
    pub character_level: u32,
    pub seed: Option<u64>,
    pub workers: Option<usize>,
    pub time_limit_secs: Option<u64>,
    pub front_order: FrontOrder,
    pub locus_weights: LocusWeights,
    /// Chance of editing the subrace/subclass instead of the race/class
    pub sub_locus_probability: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            generations: 20,
            crossover_rate: 0.9,
            mutation_rate: 0.8,
            mutation_retries: 10,
            crossover_retries: 5,
            sampling_attempts: 25,
            tournament_size: 2,
            character_level: 1,
            seed: None,
            workers: None,
            time_limit_secs: None,
            front_order: FrontOrder::Ascending,
            locus_weights: LocusWeights::default(),
            sub_locus_probability: 0.5,
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), ForgeError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ForgeError::Configuration(format!(
            "{} must be between 0 and 1",
            name
        )));
    }
    Ok(())
}

impl ConfigSection for SearchConfig {
    fn section_name() -> &'static str {
        "search"
    }

    fn validate(&self) -> Result<(), ForgeError> {
        if self.population_size < 2 {
            return Err(ForgeError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(ForgeError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        if !(1..=20).contains(&self.character_level) {
            return Err(ForgeError::Configuration(
                "Character level must be between 1 and 20".to_string(),
            ));
        }
        if self.sampling_attempts == 0 {
            return Err(ForgeError::Configuration(
                "Sampling attempts must be at least 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(ForgeError::Configuration(
                "Worker count must be at least 1 when set".to_string(),
            ));
        }
        check_probability("Crossover rate", self.crossover_rate)?;
        check_probability("Mutation rate", self.mutation_rate)?;
        check_probability("Sub-locus probability", self.sub_locus_probability)?;

        let weights = self.locus_weights.values();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ForgeError::Configuration(
                "Locus weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ForgeError::Configuration(
                "At least one locus weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        let defaults = SearchConfig::default();
        ConfigManifest {
            section: "Search".to_string(),
            fields: vec![
                FieldManifest::new(
                    "population_size",
                    "integer",
                    serde_json::json!(defaults.population_size),
                    "Individuals kept per generation",
                )
                .bounded(2.0, 1000.0),
                FieldManifest::new(
                    "generations",
                    "integer",
                    serde_json::json!(defaults.generations),
                    "Number of generations to run",
                )
                .bounded(0.0, 10000.0),
                FieldManifest::new(
                    "crossover_rate",
                    "float",
                    serde_json::json!(defaults.crossover_rate),
                    "Probability that a parent pair is recombined",
                )
                .bounded(0.0, 1.0),
                FieldManifest::new(
                    "mutation_rate",
                    "float",
                    serde_json::json!(defaults.mutation_rate),
                    "Probability that an offspring is mutated",
                )
                .bounded(0.0, 1.0),
                FieldManifest::new(
                    "mutation_retries",
                    "integer",
                    serde_json::json!(defaults.mutation_retries),
                    "Edits attempted before a mutation gives up",
                )
                .bounded(0.0, 100.0),
                FieldManifest::new(
                    "crossover_retries",
                    "integer",
                    serde_json::json!(defaults.crossover_retries),
                    "Recombinations attempted before a parent is cloned",
                )
                .bounded(0.0, 100.0),
                FieldManifest::new(
                    "sampling_attempts",
                    "integer",
                    serde_json::json!(defaults.sampling_attempts),
                    "Random builds attempted per sampled individual",
                )
                .bounded(1.0, 1000.0),
                FieldManifest::new(
                    "tournament_size",
                    "integer",
                    serde_json::json!(defaults.tournament_size),
                    "Contestants per selection tournament",
                )
                .bounded(1.0, 16.0),
                FieldManifest::new(
                    "character_level",
                    "integer",
                    serde_json::json!(defaults.character_level),
                    "Level every build is created at",
                )
                .bounded(1.0, 20.0),
                FieldManifest::new("seed", "integer?", serde_json::Value::Null, "Seed for reproducible runs"),
                FieldManifest::new("workers", "integer?", serde_json::Value::Null, "Worker threads, defaults to CPU count"),
                FieldManifest::new(
                    "time_limit_secs",
                    "integer?",
                    serde_json::Value::Null,
                    "Wall-clock limit checked between generations",
                ),
                FieldManifest::new(
                    "front_order",
                    "enum",
                    serde_json::json!("ascending"),
                    "Sort order of the returned front by health",
                ),
                FieldManifest::new(
                    "sub_locus_probability",
                    "float",
                    serde_json::json!(defaults.sub_locus_probability),
                    "Chance of mutating the subrace or subclass instead",
                )
                .bounded(0.0, 1.0),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_rates() {
        let config = SearchConfig {
            mutation_rate: 1.5,
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_all_zero_locus_weights() {
        let config = SearchConfig {
            locus_weights: LocusWeights {
                race: 0.0,
                class: 0.0,
                background: 0.0,
                languages: 0.0,
                proficiencies: 0.0,
                spells: 0.0,
                equipment: 0.0,
                skills: 0.0,
            },
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SearchConfig = toml::from_str("generations = 3\nfront_order = \"descending\"").unwrap();
        assert_eq!(config.generations, 3);
        assert_eq!(config.front_order, FrontOrder::Descending);
        assert_eq!(config.population_size, 10);
    }

    #[test]
    fn test_manifest_lists_fields() {
        let manifest = SearchConfig::default().to_manifest();
        assert_eq!(manifest.section, "Search");
        assert!(manifest.fields.iter().any(|f| f.name == "mutation_rate"));
    }
}
