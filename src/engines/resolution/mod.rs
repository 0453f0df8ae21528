pub mod requirement;
pub mod resolver;

pub use requirement::{
    requirements_from_filter, ChoiceRequirement, PoolCapacities, PoolKey, RequirementSet,
};
pub use resolver::{resolve, ResolvedItem, ResolvedSelection, ResolvedSource};
