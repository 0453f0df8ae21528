use super::{search::SearchConfig, traits::ConfigSection};
use crate::engines::fitness::ArchetypeSelection;
use crate::error::ForgeError;
use crate::types::Filter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment overrides, e.g. `CHARFORGE__SEARCH__GENERATIONS=5`
pub const ENV_PREFIX: &str = "CHARFORGE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub archetypes: ArchetypeSelection,
    pub locked: Filter,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ForgeError> {
        self.search.validate()?;
        if self.archetypes.primary.trim().is_empty() {
            return Err(ForgeError::Configuration(
                "A primary archetype is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Filter keys are case-sensitive, so the locked table is read straight from the TOML
#[derive(Default, Deserialize)]
struct LockedSection {
    #[serde(default)]
    locked: Filter,
}

/// Search and archetype settings layered from file and environment
#[derive(Default, Deserialize)]
#[serde(default)]
struct LayeredSettings {
    search: SearchConfig,
    archetypes: ArchetypeSelection,
}

fn poisoned() -> ForgeError {
    ForgeError::Configuration("Configuration lock poisoned".to_string())
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ForgeError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ForgeError::Configuration(format!("Failed to read config: {}", e)))?;

        let settings = config::Config::builder()
            .add_source(config::File::from_str(&contents, config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let layered: LayeredSettings = settings.try_deserialize()?;
        let locked: LockedSection = toml::from_str(&contents)?;

        let config = AppConfig {
            search: layered.search,
            archetypes: layered.archetypes,
            locked: locked.locked,
        };
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());

        *self.config.write().map_err(|_| poisoned())? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ForgeError> {
        let config = self.config.read().map_err(|_| poisoned())?;
        let toml_str = toml::to_string_pretty(&*config)?;

        std::fs::write(path, toml_str)
            .map_err(|e| ForgeError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, ForgeError> {
        Ok(self.config.read().map_err(|_| poisoned())?.clone())
    }

    /// Apply an edit, rolling back if the result does not validate
    pub fn update<F>(&self, f: F) -> Result<(), ForgeError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().map_err(|_| poisoned())?;
        let mut edited = config.clone();
        f(&mut edited);
        edited.validate()?;
        *config = edited;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ability, AbilityRange};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("charforge-{}-{}.toml", name, std::process::id()))
    }

    #[test]
    fn test_save_then_load_keeps_locked_filter() {
        let manager = ConfigManager::new();
        manager
            .update(|config| {
                config.search.generations = 7;
                config.archetypes = ArchetypeSelection::pair("Blaster", "Scout");
                config.locked = Filter::default()
                    .with_race("Elf")
                    .with_ability(Ability::Dexterity, AbilityRange::new(14, 17));
            })
            .unwrap();

        let path = temp_path("roundtrip");
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.get().unwrap(), manager.get().unwrap());
    }

    #[test]
    fn test_invalid_update_is_rolled_back() {
        let manager = ConfigManager::new();
        let result = manager.update(|config| config.search.crossover_rate = 2.0);
        assert!(result.is_err());
        assert_eq!(manager.get().unwrap().search.crossover_rate, 0.9);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let path = temp_path("invalid");
        std::fs::write(&path, "[search]\npopulation_size = 1\n").unwrap();
        let manager = ConfigManager::new();
        assert!(manager.load_from_file(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
