//! Character build search: resolve a partial set of choices into a legal
//! character, score it against archetypes, and evolve a Pareto front of
//! builds under user-locked constraints.

pub mod config;
pub mod content;
pub mod engines;
pub mod error;
pub mod types;

pub use config::{AppConfig, ConfigManager, SearchConfig};
pub use content::{Catalogue, ContentRepository};
pub use engines::fitness::{ArchetypeSelection, Fitness};
pub use engines::generation::{Individual, SearchEngine, SearchOutcome, SearchState};
pub use engines::materialize::{Build, Materializer};
pub use error::{ForgeError, Result};
pub use types::{Ability, AbilityRange, ChoiceCategory, Filter, FilterKey, SourceKind};
