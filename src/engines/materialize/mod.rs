pub mod build;
pub mod chooser;
pub mod materializer;
pub mod point_buy;

pub use build::{Build, ProficiencySet, SourcedGrant, Spellcasting};
pub use chooser::Chooser;
pub use materializer::{resolve_equipment, Materializer};
pub use point_buy::{point_buy, priority_order, purchasable_range, POINT_BUY_BUDGET};
